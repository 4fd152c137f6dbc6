use backend_lib::auth::nickname::{allocate, claim, normalize, NicknameCandidates};
use backend_lib::directory::{Credential, Directory, DirectoryError, MemoryDirectory, NewAccount, UniqueField};
use std::sync::Arc;

fn row(nickname: String, email: &str) -> NewAccount {
    NewAccount {
        nickname,
        email: email.to_string(),
        credential: Credential::FederatedOnly,
        federated_id: None,
    }
}

#[test]
fn test_normalize() {
    assert_eq!(normalize("  Pro   Gamer "), "Pro_Gamer");
    assert_eq!(normalize(""), "user");
    assert_eq!(normalize("   "), "user");
    assert_eq!(normalize(&"é".repeat(40)).chars().count(), 30);
}

#[test]
fn test_candidate_order() {
    let long = "a".repeat(30);
    let mut candidates = NicknameCandidates::new(&long);
    assert_eq!(candidates.next().unwrap(), long);
    assert_eq!(candidates.next().unwrap(), format!("{}1", "a".repeat(28)));

    let all: Vec<String> = NicknameCandidates::new("Ana").collect();
    assert_eq!(all.len(), 1001);
    assert_eq!(all[999], "Ana999");
    assert!(all[1000].starts_with("Ana_"));
}

#[tokio::test]
async fn test_allocate_skips_taken_names() {
    let dir = MemoryDirectory::new();
    assert_eq!(allocate(&dir, "Ana").await.unwrap(), "Ana");

    dir.insert_account(row("Ana".to_string(), "a1@x.com")).await.unwrap();
    dir.insert_account(row("Ana1".to_string(), "a2@x.com")).await.unwrap();
    assert_eq!(allocate(&dir, "Ana").await.unwrap(), "Ana2");
}

#[tokio::test]
async fn test_claim_passes_email_conflicts_through() {
    let dir = MemoryDirectory::new();
    claim(&dir, "Ana", |n| row(n, "a@x.com")).await.unwrap();

    let err = claim(&dir, "Bob", |n| row(n, "A@x.com")).await.unwrap_err();
    assert!(matches!(err, DirectoryError::Conflict(UniqueField::Email)));
    assert_eq!(dir.account_count(), 1);
}

#[tokio::test]
async fn test_parallel_claims_never_collide() {
    let dir = Arc::new(MemoryDirectory::new());
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let dir = dir.clone();
            tokio::spawn(async move {
                claim(dir.as_ref(), "Ana", move |n| row(n, &format!("p{i}@x.com")))
                    .await
                    .unwrap()
                    .nickname
            })
        })
        .collect();

    let mut names = Vec::new();
    for handle in handles {
        names.push(handle.await.unwrap());
    }
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 16);
    assert!(names.contains(&"Ana".to_string()));
}

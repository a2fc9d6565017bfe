//! Domain service and local client against a migrated in-memory SQLite database.

mod common;

use std::sync::Arc;

use anyhow::Result;
use sea_orm::{EntityTrait, PaginatorTrait};

use notes::contract::{
    client::NotesApi,
    error::NotesError,
    model::{NewNote, NewUser, NotePatch},
};
use notes::domain::error::DomainError;
use notes::gateways::local::NotesLocalClient;
use notes::infra::storage::entity::{auth_token, note, user};

fn new_user(username: &str) -> NewUser {
    NewUser {
        username: username.to_string(),
        email: None,
        password: "correct-horse".to_string(),
    }
}

fn text(t: &str) -> NewNote {
    NewNote {
        text: t.to_string(),
    }
}

#[tokio::test]
async fn note_lifecycle_through_the_service() -> Result<()> {
    let service = common::test_service().await;
    let a = service.register(new_user("A")).await?;

    let created = service.create_note(&a, text("  buy milk  ")).await?;
    assert_eq!(created.text, "buy milk");
    assert_eq!(created.user.id, a.id);
    assert_eq!(created.date_created, created.date_edited);

    let patched = service
        .update_note(&a, created.id, NotePatch { text: None })
        .await?;
    assert_eq!(patched.text, "buy milk");
    assert!(patched.date_edited > created.date_edited);
    assert_eq!(patched.date_created, created.date_created);

    let again = service
        .update_note(
            &a,
            created.id,
            NotePatch {
                text: Some("buy milk and eggs".into()),
            },
        )
        .await?;
    assert!(again.date_edited > patched.date_edited);

    let stored = service.get_note(&a, created.id).await?;
    assert_eq!(stored, again);

    service.delete_note(&a, created.id).await?;
    assert!(matches!(
        service.get_note(&a, created.id).await,
        Err(DomainError::NoteNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn ownership_is_checked_before_validation() -> Result<()> {
    let service = common::test_service().await;
    let a = service.register(new_user("A")).await?;
    let b = service.register(new_user("B")).await?;
    let note = service.create_note(&a, text("secret")).await?;

    let err = service
        .update_note(
            &b,
            note.id,
            NotePatch {
                text: Some(String::new()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NoteForbidden { .. }));

    let err = service.delete_note(&b, note.id).await.unwrap_err();
    assert!(matches!(err, DomainError::NoteForbidden { .. }));
    assert_eq!(service.get_note(&a, note.id).await?.text, "secret");
    Ok(())
}

#[tokio::test]
async fn usernames_are_unique_and_passwords_hashed() -> Result<()> {
    let db = common::test_db().await;
    let service = notes::build_service(db.sea(), &common::test_config())?;
    service.register(new_user("A")).await?;

    let err = service.register(new_user("A")).await.unwrap_err();
    match err {
        DomainError::Validation { errors } => assert_eq!(errors[0].field, "username"),
        other => panic!("unexpected error: {other:?}"),
    }

    let row = user::Entity::find().one(db.seaorm()).await?.unwrap();
    assert!(row.password_hash.starts_with("$argon2id$"));
    assert!(!row.password_hash.contains("correct-horse"));
    Ok(())
}

#[tokio::test]
async fn tokens_are_stored_hashed_and_revocable() -> Result<()> {
    let db = common::test_db().await;
    let service = notes::build_service(db.sea(), &common::test_config())?;
    let a = service.register(new_user("A")).await?;

    let outcome = service.login("A", "correct-horse").await?;
    assert_eq!(outcome.user, a);
    assert_eq!(service.authenticate_token(&outcome.token).await?, a);

    let row = auth_token::Entity::find().one(db.seaorm()).await?.unwrap();
    assert_ne!(row.key_hash, outcome.token);

    assert!(service.logout(&outcome.token).await?);
    assert!(!service.logout(&outcome.token).await?);
    assert!(matches!(
        service.authenticate_token(&outcome.token).await,
        Err(DomainError::NotAuthenticated)
    ));

    assert!(matches!(
        service.login("A", "wrong").await,
        Err(DomainError::InvalidCredentials)
    ));
    assert!(matches!(
        service.login("nobody", "correct-horse").await,
        Err(DomainError::InvalidCredentials)
    ));
    Ok(())
}

#[tokio::test]
async fn delete_user_cascades_to_notes_and_tokens() -> Result<()> {
    let db = common::test_db().await;
    let service = notes::build_service(db.sea(), &common::test_config())?;
    let a = service.register(new_user("A")).await?;
    let b = service.register(new_user("B")).await?;
    service.create_note(&a, text("one")).await?;
    service.create_note(&a, text("two")).await?;
    service.create_note(&b, text("keep")).await?;
    let token = service.login("A", "correct-horse").await?.token;

    let deleted = service.delete_user("A").await?;
    assert_eq!(deleted.user.id, a.id);
    assert_eq!(deleted.notes, 2);
    assert_eq!(deleted.tokens, 1);

    assert_eq!(note::Entity::find().count(db.seaorm()).await?, 1);
    assert_eq!(auth_token::Entity::find().count(db.seaorm()).await?, 0);
    assert!(service.authenticate_token(&token).await.is_err());
    assert_eq!(service.list_notes(&b).await?.len(), 1);

    assert!(matches!(
        service.delete_user("A").await,
        Err(DomainError::UserNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn local_client_applies_the_same_rules() -> Result<()> {
    let service = common::test_service().await;
    let client: Arc<dyn NotesApi> = Arc::new(NotesLocalClient::new(service));

    let a = client.register_user(new_user("A")).await?;
    let b = client.register_user(new_user("B")).await?;
    assert_eq!(client.get_user(a.id).await?, a);

    let note = client.create_note(a.id, text("hello")).await?;
    assert_eq!(client.list_notes(a.id).await?, vec![note.clone()]);

    let err = client.get_note(b.id, note.id).await.unwrap_err();
    assert!(matches!(err, NotesError::Forbidden { .. }));

    let err = client.get_note(a.id, 999).await.unwrap_err();
    assert!(matches!(err, NotesError::NotFound { .. }));

    let err = client.create_note(4242, text("ghost")).await.unwrap_err();
    assert!(matches!(err, NotesError::NotFound { .. }));

    let err = client
        .register_user(NewUser {
            password: "short".into(),
            ..new_user("C")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, NotesError::Validation { .. }));

    let updated = client
        .update_note(
            a.id,
            note.id,
            NotePatch {
                text: Some("hello again".into()),
            },
        )
        .await?;
    assert_eq!(updated.text, "hello again");

    client.delete_note(a.id, note.id).await?;
    let deleted = client.delete_user("A").await?;
    assert_eq!(deleted.notes, 0);
    Ok(())
}

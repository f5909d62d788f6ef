mod common;

use bytes::Bytes;
use common::signed_in;
use retirement_core::{DocumentUploader, ProfileError};

#[tokio::test]
async fn documents_are_stored_under_the_owner_and_listed() {
    let (gateway, session, identity) = signed_in().await;
    let uploader = DocumentUploader::new(session, gateway.clone(), gateway.clone());

    let doc = uploader
        .upload("Statement.PDF", Bytes::from_static(b"%PDF-1.7"), Some("Q3".into()))
        .await
        .unwrap();

    assert!(doc.storage_path.starts_with(&format!("{}/", identity.id)));
    assert!(doc.storage_path.ends_with(".pdf"));
    assert_eq!(doc.status, "pending_analysis");
    assert_eq!(doc.file_size, 8);
    assert_eq!(uploader.list().await.unwrap(), vec![doc]);

    uploader.remove_all().await.unwrap();
    assert!(gateway.blob_paths().is_empty());
}

#[tokio::test]
async fn unsupported_documents_are_rejected_before_upload() {
    let (gateway, session, _) = signed_in().await;
    let uploader = DocumentUploader::new(session, gateway.clone(), gateway.clone());

    let err = uploader
        .upload("macro.docm", Bytes::from_static(b"x"), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ProfileError::Validation(_)));
    assert!(gateway.blob_paths().is_empty());
}

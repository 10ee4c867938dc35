use std::collections::HashSet;

use soundry_storage::{AudioExtension, FileIdentity, StorageLayout};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_never_collide() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let layout = StorageLayout::new(
        temp.path().join("uploads"),
        temp.path().join("outputs"),
        temp.path().join("separated"),
    );
    layout.ensure_directories()?;

    let mut tasks = Vec::new();
    for i in 0..32u8 {
        let layout = layout.clone();
        tasks.push(tokio::spawn(async move {
            let identity = FileIdentity::new_upload(AudioExtension::Wav);
            layout.persist_upload(identity, &[i; 16]).await
        }));
    }

    let mut paths = HashSet::new();
    for task in tasks {
        let upload = task.await??;
        assert!(paths.insert(upload.path.clone()));
    }
    assert_eq!(paths.len(), 32);
    assert_eq!(std::fs::read_dir(layout.upload_dir())?.count(), 32);
    Ok(())
}

// ABOUTME: Integration tests for the ledger file and the ledger lock.
// ABOUTME: Tests atomic saves, preserved fields, bounded waits and holder reporting.

use bitswan_gitops::ledger::{
    CorruptLedgerPolicy, LEDGER_FILENAME, Ledger, LedgerError, LedgerLock, LockError, LockInfo,
};
use bitswan_gitops::types::{DeploymentId, Fingerprint};
use std::fs;
use std::time::{Duration, Instant};

fn fp(c: char) -> Fingerprint {
    Fingerprint::parse(&c.to_string().repeat(64)).unwrap()
}

mod ledger_file {
    use super::*;

    #[tokio::test]
    async fn save_preserves_foreign_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(LEDGER_FILENAME),
            "deployments:\n  legacy:\n    checksum: abc\n    active: false\n    replicas: 2\nversion: 3\n",
        )
        .unwrap();
        let ledger = Ledger::in_dir(dir.path(), CorruptLedgerPolicy::FailClosed);
        let lock = LedgerLock::acquire(&LockInfo::lock_path(dir.path()), Duration::from_secs(1), None)
            .await
            .unwrap();

        let mut doc = ledger.load().unwrap();
        doc.upsert(&DeploymentId::new("svc1").unwrap(), &fp('a'));
        ledger.save(&doc, &lock).unwrap();

        let raw = fs::read_to_string(ledger.path()).unwrap();
        assert!(raw.contains("replicas: 2"), "{raw}");
        assert!(raw.contains("version: 3"), "{raw}");

        let reread = ledger.load().unwrap();
        assert!(!reread.deployments["legacy"].active);
        assert!(reread.deployments["svc1"].active);
    }

    #[tokio::test]
    async fn save_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::in_dir(dir.path(), CorruptLedgerPolicy::FailClosed);
        let lock = LedgerLock::acquire(&LockInfo::lock_path(dir.path()), Duration::from_secs(1), None)
            .await
            .unwrap();

        let mut doc = ledger.load().unwrap();
        for c in ['a', 'b', 'c'] {
            doc.upsert(&DeploymentId::new("svc1").unwrap(), &fp(c));
            ledger.save(&doc, &lock).unwrap();
        }

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["bitswan.yaml", "bitswan_git.lock"]);
    }

    #[test]
    fn unreadable_ledger_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be cannot be read as text.
        fs::create_dir(dir.path().join(LEDGER_FILENAME)).unwrap();
        let ledger = Ledger::in_dir(dir.path(), CorruptLedgerPolicy::ResetToEmpty);

        assert!(matches!(ledger.load(), Err(LedgerError::Read { .. })));
    }

    #[test]
    fn corrupt_policy_parses_from_kebab_case() {
        let policy: CorruptLedgerPolicy = serde_yaml::from_str("reset-to-empty").unwrap();
        assert_eq!(policy, CorruptLedgerPolicy::ResetToEmpty);
        assert_eq!(CorruptLedgerPolicy::default(), CorruptLedgerPolicy::FailClosed);
    }
}

mod ledger_lock {
    use super::*;

    #[tokio::test]
    async fn timeout_reports_current_holder() {
        let dir = tempfile::tempdir().unwrap();
        let path = LockInfo::lock_path(dir.path());
        let _held = LedgerLock::acquire(&path, Duration::from_secs(1), Some("svc1"))
            .await
            .unwrap();

        let started = Instant::now();
        let err = LedgerLock::acquire(&path, Duration::from_millis(150), Some("svc2"))
            .await
            .unwrap_err();

        assert!(started.elapsed() >= Duration::from_millis(150));
        match err {
            LockError::Timeout { timeout, holder } => {
                assert_eq!(timeout, Duration::from_millis(150));
                let holder = holder.expect("holder info should be readable");
                assert_eq!(holder.deployment.as_deref(), Some("svc1"));
                assert_eq!(holder.pid, std::process::id());
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn waiter_acquires_after_release() {
        let dir = tempfile::tempdir().unwrap();
        let path = LockInfo::lock_path(dir.path());
        let held = LedgerLock::acquire(&path, Duration::from_secs(1), None)
            .await
            .unwrap();

        let releaser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            held.release();
        });

        let lock = LedgerLock::acquire(&path, Duration::from_secs(5), Some("waiter"))
            .await
            .unwrap();
        releaser.await.unwrap();

        assert_eq!(
            LockInfo::read(lock.path()).and_then(|i| i.deployment),
            Some("waiter".to_string())
        );
    }

    #[tokio::test]
    async fn lock_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = LockInfo::lock_path(&dir.path().join("nested/gitops"));

        let lock = LedgerLock::acquire(&path, Duration::from_secs(1), None)
            .await
            .unwrap();
        assert!(path.exists());
        lock.release();
    }
}

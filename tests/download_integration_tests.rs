//! Integration tests for DownloadService
//!
//! These tests drive complete download runs against a fake SteamCMD shell
//! script, verifying:
//! - End-to-end relocation of a reported download
//! - Failure policy for unknown destinations
//! - Deadline enforcement with process termination
//! - Exit-status mapping (login failure vs. abnormal exit)

#![cfg(unix)]

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Instant;
use tempfile::TempDir;
use workshopdl::models::{App, Config, Login, Mod, Steam};
use workshopdl::services::{DownloadError, DownloadService};

fn utf8(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
}

/// Write an executable shell script standing in for SteamCMD.
fn fake_steamcmd(dir: &Utf8Path, body: &str) -> Utf8PathBuf {
    let path = dir.join("steamcmd.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn app(id: &str, path: &Utf8Path, mods: &[&str]) -> App {
    App {
        name: format!("game-{id}"),
        id: id.to_string(),
        path: path.to_string(),
        mods: mods
            .iter()
            .map(|m| Mod {
                name: String::new(),
                id: m.to_string(),
            })
            .collect(),
    }
}

fn config(cmd: &Utf8Path, timeout_secs: u64, fail_fast: bool, apps: Vec<App>) -> Config {
    Config {
        steam: Steam {
            cmd: cmd.to_string(),
            login: Login::default(),
            timeout_secs,
            fail_fast,
        },
        apps,
    }
}

/// Create `<root>/content/<app>/<mod>/mods` with one file in it and return
/// the item directory SteamCMD would report.
fn seed_content(root: &Utf8Path, app_id: &str, mod_id: &str) -> Utf8PathBuf {
    let item_dir = root.join(format!("content/{app_id}/{mod_id}"));
    fs::create_dir_all(item_dir.join("mods")).unwrap();
    fs::write(item_dir.join("mods/mod.info"), format!("id = {mod_id}")).unwrap();
    item_dir
}

#[tokio::test]
async fn test_end_to_end_download_and_relocation() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let item_dir = seed_content(&root, "108600", "2169435993");
    let dest = root.join("games/pz");
    fs::create_dir_all(&dest).unwrap();

    let script = fake_steamcmd(
        &root,
        &format!(
            "echo 'Loading Steam API...OK'\n\
             echo 'Success. Downloaded item 2169435993 to \"{item_dir}\" (31729 bytes)'"
        ),
    );

    let cfg = config(&script, 30, true, vec![app("108600", &dest, &["2169435993"])]);
    let report = DownloadService::new().run(&cfg).await.unwrap();

    assert_eq!(report.relocated, 1);
    assert_eq!(report.bytes, 31729);
    assert_eq!(
        fs::read_to_string(dest.join("mod.info")).unwrap(),
        "id = 2169435993"
    );
}

#[tokio::test]
async fn test_multiple_downloads_relocate_in_order() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let first = seed_content(&root, "108600", "111");
    let second = seed_content(&root, "294100", "222");
    let dest_pz = root.join("games/pz");
    let dest_rim = root.join("games/rimworld");
    fs::create_dir_all(&dest_pz).unwrap();
    fs::create_dir_all(&dest_rim).unwrap();

    let script = fake_steamcmd(
        &root,
        &format!(
            "echo 'Success. Downloaded item 111 to \"{first}\" (10 bytes)'\n\
             echo 'Success. Downloaded item 222 to \"{second}\" (20 bytes)'"
        ),
    );

    let cfg = config(
        &script,
        30,
        true,
        vec![app("108600", &dest_pz, &["111"]), app("294100", &dest_rim, &["222"])],
    );
    let report = DownloadService::new().run(&cfg).await.unwrap();

    assert_eq!(report.relocated, 2);
    assert_eq!(report.bytes, 30);
    assert!(dest_pz.join("mod.info").exists());
    assert!(dest_rim.join("mod.info").exists());
}

#[tokio::test]
async fn test_unknown_destination_fails_fast() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let item_dir = seed_content(&root, "999999", "42");
    let dest = root.join("games/pz");
    fs::create_dir_all(&dest).unwrap();

    // The sleep would hold the run for 10s if fail-fast did not kill it.
    let script = fake_steamcmd(
        &root,
        &format!(
            "echo 'Success. Downloaded item 42 to \"{item_dir}\" (5 bytes)'\n\
             sleep 10"
        ),
    );

    let cfg = config(&script, 30, true, vec![app("108600", &dest, &["1"])]);
    let started = Instant::now();
    let err = DownloadService::new().run(&cfg).await.unwrap_err();

    match err {
        DownloadError::DestinationNotFound { app_id, mod_id } => {
            assert_eq!(app_id, "999999");
            assert_eq!(mod_id, "42");
        }
        other => panic!("expected DestinationNotFound, got {other}"),
    }
    assert!(started.elapsed().as_secs() < 10, "fail-fast should kill the process");
    assert_eq!(fs::read_dir(dest.as_std_path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_halt_without_fail_fast_awaits_exit() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let bad_item = seed_content(&root, "999999", "42");
    let good_item = seed_content(&root, "108600", "7");
    let dest = root.join("games/pz");
    fs::create_dir_all(&dest).unwrap();

    let script = fake_steamcmd(
        &root,
        &format!(
            "echo 'Success. Downloaded item 42 to \"{bad_item}\" (5 bytes)'\n\
             echo 'Success. Downloaded item 7 to \"{good_item}\" (5 bytes)'"
        ),
    );

    let cfg = config(&script, 30, false, vec![app("108600", &dest, &["7"])]);
    let err = DownloadService::new().run(&cfg).await.unwrap_err();

    assert!(matches!(err, DownloadError::DestinationNotFound { .. }));
    // Relocation ceased after the first failure; the later event was dropped.
    assert_eq!(fs::read_dir(dest.as_std_path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_deadline_kills_slow_process() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let script = fake_steamcmd(&root, "sleep 10");
    let cfg = config(&script, 1, true, vec![]);

    let started = Instant::now();
    let err = DownloadService::new().run(&cfg).await.unwrap_err();

    assert!(matches!(err, DownloadError::Timeout(_)));
    assert!(started.elapsed().as_secs() < 10, "process should be killed at the deadline");
}

#[tokio::test]
async fn test_nonzero_exit_without_downloads_is_login_failure() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let script = fake_steamcmd(
        &root,
        "echo \"Steam>Logging in user 'anonymous' to Steam Public...FAILED\"\nexit 5",
    );
    let cfg = config(&script, 30, true, vec![]);

    let err = DownloadService::new().run(&cfg).await.unwrap_err();
    match err {
        DownloadError::LoginFailed { username } => assert_eq!(username, "anonymous"),
        other => panic!("expected LoginFailed, got {other}"),
    }
}

#[tokio::test]
async fn test_nonzero_exit_after_downloads_is_process_error() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let item_dir = seed_content(&root, "108600", "7");
    let dest = root.join("games/pz");
    fs::create_dir_all(&dest).unwrap();

    let script = fake_steamcmd(
        &root,
        &format!(
            "echo 'Success. Downloaded item 7 to \"{item_dir}\" (5 bytes)'\n\
             exit 3"
        ),
    );

    let cfg = config(&script, 30, true, vec![app("108600", &dest, &["7"])]);
    let err = DownloadService::new().run(&cfg).await.unwrap_err();

    assert!(matches!(err, DownloadError::ProcessExit { .. }));
    // The mod relocated before the abnormal exit stays in place.
    assert!(dest.join("mod.info").exists());
}

#[tokio::test]
async fn test_missing_executable_is_launch_error() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let cfg = config(&root.join("missing/steamcmd"), 30, true, vec![]);
    let err = DownloadService::new().run(&cfg).await.unwrap_err();

    assert!(matches!(err, DownloadError::Launch { .. }));
}

#[tokio::test]
async fn test_rerun_overwrites_destination() {
    let work = TempDir::new().unwrap();
    let root = utf8(&work);

    let item_dir = seed_content(&root, "108600", "7");
    let dest = root.join("games/pz");
    fs::create_dir_all(&dest).unwrap();

    let script = fake_steamcmd(
        &root,
        &format!("echo 'Success. Downloaded item 7 to \"{item_dir}\" (5 bytes)'"),
    );
    let cfg = config(&script, 30, true, vec![app("108600", &dest, &["7"])]);

    let service = DownloadService::new();
    service.run(&cfg).await.unwrap();
    fs::write(item_dir.join("mods/mod.info"), "id = updated").unwrap();
    service.run(&cfg).await.unwrap();

    assert_eq!(fs::read_to_string(dest.join("mod.info")).unwrap(), "id = updated");
}

//! Recursive directory replication.
//!
//! Copies a downloaded item's directory tree into its configured destination.
//! Mode bits are preserved and symlinks are recreated with their original
//! targets rather than followed. Running the same copy twice leaves the
//! destination in the same state as running it once; existing files and links
//! are replaced.

use camino::Utf8Path;
use std::fs;
use std::io;

/// Copy the directory tree rooted at `src` into `dst`.
///
/// `dst` and any missing parent directories are created. Fails with the
/// underlying IO error on the first entry that cannot be copied.
pub fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    if !meta.is_dir() {
        return Err(io::Error::other(format!("source {src} is not a directory")));
    }

    fs::create_dir_all(dst)?;
    fs::set_permissions(dst, meta.permissions())?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name
            .to_str()
            .ok_or_else(|| io::Error::other(format!("non-UTF-8 file name under {src}")))?;

        let src_child = src.join(name);
        let dst_child = dst.join(name);
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            copy_tree(&src_child, &dst_child)?;
        } else if file_type.is_symlink() {
            copy_link(&src_child, &dst_child)?;
        } else {
            // fs::copy truncates an existing destination and carries mode bits.
            fs::copy(&src_child, &dst_child)?;
        }
    }

    Ok(())
}

fn copy_link(src: &Utf8Path, dst: &Utf8Path) -> io::Result<()> {
    let target = fs::read_link(src)?;

    // Symlink creation fails on an existing path, so replace it.
    if fs::symlink_metadata(dst).is_ok() {
        fs::remove_file(dst)?;
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(&target, dst)?;

    #[cfg(windows)]
    match fs::metadata(src) {
        Ok(meta) if meta.is_dir() => std::os::windows::fs::symlink_dir(&target, dst)?,
        _ => std::os::windows::fs::symlink_file(&target, dst)?,
    }

    Ok(())
}

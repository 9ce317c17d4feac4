//! Integration tests for mounting, precedence and write redirection.
//!
//! Every test builds real directory fixtures in temporary folders and
//! drives the file system through its public API only.

mod common;

use common::write;
use mountfs_core::{FileSystem, MountPoint};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Later mounts shadow earlier ones for the same virtual path
#[test]
fn test_later_mount_wins() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write(a.path(), "x.txt", "from a");
    write(b.path(), "x.txt", "from b");

    let mut fs = FileSystem::new();
    fs.mount(a.path(), "/").unwrap();
    fs.mount(b.path(), "/").unwrap();

    assert_eq!(fs.read_file("/x.txt").unwrap(), b"from b");

    // The rebuilt tree applies the same order
    fs.refresh().unwrap();
    let file = fs.get_file("/x.txt").unwrap().unwrap();
    assert_eq!(file.physical_path(), b.path().join("x.txt"));
    assert_eq!(fs.read_file("/x.txt").unwrap(), b"from b");
}

/// Files from both mounts are merged when they do not collide
#[test]
fn test_mounts_merge() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write(a.path(), "shared/one.txt", "1");
    write(b.path(), "shared/two.txt", "2");

    let mut fs = FileSystem::new();
    fs.mount(a.path(), "/").unwrap();
    fs.mount(b.path(), "/").unwrap();

    let shared = fs.get_directory("/shared").unwrap().unwrap();
    assert_eq!(shared.file_count(false), 2);
}

/// Written content shadows every mount, whatever the mount order
#[test]
fn test_write_location_shadows_mounts() {
    let base = TempDir::new().unwrap();
    let late = TempDir::new().unwrap();
    let saves = TempDir::new().unwrap();
    write(base.path(), "config.ini", "base");
    write(late.path(), "config.ini", "late");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();
    fs.set_write_location(saves.path()).unwrap();
    fs.write_file("/config.ini", Some(b"saved")).unwrap();
    assert_eq!(fs.read_file("/config.ini").unwrap(), b"saved");

    // Mounting after the write keeps the written copy on top
    fs.mount(late.path(), "/").unwrap();
    assert_eq!(fs.read_file("/config.ini").unwrap(), b"saved");

    fs.refresh().unwrap();
    assert_eq!(fs.read_file("/config.ini").unwrap(), b"saved");
}

/// Mounting and unmounting leaves no trace of the mount
#[test]
fn test_mount_unmount_round_trip() {
    let base = TempDir::new().unwrap();
    let extra = TempDir::new().unwrap();
    write(base.path(), "keep.txt", "keep");
    write(extra.path(), "extra/deep/file.txt", "extra");
    write(extra.path(), "keep.txt", "shadow");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();
    let files_before = fs.root().file_count(true);
    let dirs_before = fs.root().directory_count();

    let mount = fs.mount(extra.path(), "/").unwrap();
    assert_eq!(fs.read_file("/keep.txt").unwrap(), b"shadow");

    fs.unmount(&mount).unwrap();

    assert_eq!(fs.root().file_count(true), files_before);
    assert_eq!(fs.root().directory_count(), dirs_before);
    assert!(fs.get_directory("/extra").unwrap().is_none());
    assert_eq!(fs.read_file("/keep.txt").unwrap(), b"keep");
    assert_eq!(fs.mount_points().len(), 1);
}

/// Unmounting by an equivalent mount point value works too
#[test]
fn test_unmount_by_equal_value() {
    let base = TempDir::new().unwrap();
    write(base.path(), "a.txt", "a");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/Data").unwrap();

    let same = MountPoint::new(base.path(), "data/").unwrap();
    fs.unmount(&same).unwrap();

    assert!(fs.mount_points().is_empty());
    assert!(fs.get_directory("/data").unwrap().is_none());
}

/// Mounting the same pair twice records a single mount point
#[test]
fn test_idempotent_mount() {
    let base = TempDir::new().unwrap();
    write(base.path(), "a.txt", "a");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();
    fs.mount(base.path(), "/").unwrap();
    fs.mount_root(base.path()).unwrap();

    assert_eq!(fs.mount_points().len(), 1);
    assert_eq!(fs.root().file_count(true), 1);
}

/// Mount points record absolute physical paths
#[test]
fn test_mount_records_absolute_path() {
    let base = TempDir::new().unwrap();
    let mut fs = FileSystem::new();

    let mount = fs.mount(base.path(), "/").unwrap();

    assert!(mount.physical_path().is_absolute());
    let again = fs.mount_point(&mount).unwrap();
    assert_eq!(again, mount);
    assert_eq!(fs.mount_points().len(), 1);
}

/// Different spellings of a directory path resolve to the same entry
#[test]
fn test_path_normalization() {
    let base = TempDir::new().unwrap();
    write(base.path(), "foo/bar/file.txt", "f");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();

    let a = fs.get_directory("foo/bar").unwrap().unwrap();
    let b = fs.get_directory("/foo/bar/").unwrap().unwrap();
    let c = fs.get_directory("/foo/bar").unwrap().unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
}

/// Lookups ignore case
#[test]
fn test_case_insensitive_lookup() {
    let base = TempDir::new().unwrap();
    write(base.path(), "data/file.txt", "content");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();

    let upper = fs.get_file("/Data/FILE.TXT").unwrap().unwrap();
    let lower = fs.get_file("/data/file.txt").unwrap().unwrap();
    assert!(Arc::ptr_eq(&upper, &lower));
}

/// Mounting under a location nests the content there
#[test]
fn test_mount_under_location() {
    let base = TempDir::new().unwrap();
    write(base.path(), "maps/one.map", "1");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/content/base").unwrap();

    let file = fs.get_file("/content/base/maps/one.map").unwrap().unwrap();
    assert_eq!(file.mount_point().mount_location(), "/content/base/");
    assert!(fs.get_file("/maps/one.map").unwrap().is_none());
}

/// Entries keep their identity when a refresh switches their source
#[test]
fn test_refresh_updates_entries_in_place() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();
    write(a.path(), "x.txt", "a");
    write(b.path(), "x.txt", "bb");

    let mut fs = FileSystem::new();
    let mount_a = fs.mount(a.path(), "/").unwrap();
    fs.mount(b.path(), "/").unwrap();
    let held = fs.get_file("/x.txt").unwrap().unwrap();
    assert_eq!(held.size(), 2);

    let mount_b = MountPoint::new(b.path(), "/").unwrap();
    fs.unmount(&mount_b).unwrap();

    let current = fs.get_file("/x.txt").unwrap().unwrap();
    assert!(Arc::ptr_eq(&held, &current));
    assert_eq!(held.size(), 1);
    assert_eq!(held.mount_point(), mount_a);
}

/// A refresh picks up files changed on disk
#[test]
fn test_refresh_sees_disk_changes() {
    let base = TempDir::new().unwrap();
    write(base.path(), "old.txt", "old");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();

    fs::remove_file(base.path().join("old.txt")).unwrap();
    write(base.path(), "new.txt", "new");
    fs.refresh().unwrap();

    assert!(fs.get_file("/old.txt").unwrap().is_none());
    assert_eq!(fs.read_file("/new.txt").unwrap(), b"new");
}

/// A vanished mount target stops the refresh with an error but the write
/// location is still applied
#[test]
fn test_refresh_reports_missing_mount() {
    let base = TempDir::new().unwrap();
    let saves = TempDir::new().unwrap();
    let gone = base.path().join("gone");
    write(&gone, "a.txt", "a");

    let mut fs = FileSystem::new();
    fs.set_write_location(saves.path()).unwrap();
    fs.write_file("/saved.txt", Some(b"s")).unwrap();
    fs.mount(&gone, "/").unwrap();

    fs::remove_dir_all(&gone).unwrap();
    let err = fs.refresh().unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(fs.read_file("/saved.txt").unwrap(), b"s");
    assert!(fs.get_file("/a.txt").unwrap().is_none());
}

/// Written files survive a refresh because they live in the write location
#[test]
fn test_written_files_survive_refresh() {
    let saves = TempDir::new().unwrap();
    let mut fs = FileSystem::new();
    fs.set_write_location(saves.path()).unwrap();

    fs.write_file("/a/b/c.txt", Some(b"c")).unwrap();
    fs.create_directory("/empty/dir").unwrap();
    fs.refresh().unwrap();

    assert_eq!(fs.read_file("/a/b/c.txt").unwrap(), b"c");
    assert!(fs.get_directory("/empty/dir").unwrap().is_some());
}

/// Setting the write location picks up content already stored there
#[test]
fn test_existing_write_location_content_is_mounted() {
    let saves = TempDir::new().unwrap();
    write(saves.path(), "profile/user.cfg", "name=x");

    let mut fs = FileSystem::new();
    fs.set_write_location(saves.path()).unwrap();

    assert_eq!(fs.read_file("/profile/user.cfg").unwrap(), b"name=x");
    assert!(fs.mount_points().is_empty());
}

/// Clearing the write location removes written content from the tree
#[test]
fn test_clear_write_location() {
    let saves = TempDir::new().unwrap();
    let mut fs = FileSystem::new();
    fs.set_write_location(saves.path()).unwrap();
    fs.write_file("/a.txt", Some(b"a")).unwrap();

    fs.clear_write_location().unwrap();

    assert!(fs.write_location().is_none());
    assert!(fs.get_file("/a.txt").unwrap().is_none());
    assert!(saves.path().join("a.txt").exists());
}

/// A missing write location is created on demand
#[test]
fn test_write_location_is_created() {
    let temp = TempDir::new().unwrap();
    let saves = temp.path().join("new/saves");

    let mut fs = FileSystem::new();
    fs.set_write_location(&saves).unwrap();

    assert!(saves.is_dir());
    assert_eq!(fs.write_location(), Some(saves.as_path()));
}

/// Scenario: create nested directories and find the leaf
#[test]
fn test_create_directory_scenario() {
    let mut fs = FileSystem::new();
    fs.create_directory("/a/b/c").unwrap();

    let b = fs.get_directory("/a/b").unwrap().unwrap();
    let names: Vec<String> = b
        .directories()
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(names, vec!["c"]);
}

/// Scenario: search for text files across the tree
#[test]
fn test_find_files_scenario() {
    let base = TempDir::new().unwrap();
    write(base.path(), "a.txt", "a");
    write(base.path(), "sub/b.txt", "b");
    write(base.path(), "sub/c.dat", "c");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();

    let found = fs.find_files("*.txt", true).unwrap();
    let mut names: Vec<&str> = found.iter().map(|f| f.name()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["a.txt", "b.txt"]);

    // Children come before the start directory's own files
    assert_eq!(found[0].full_path(), "/sub/b.txt");

    let shallow = fs.find_files("*.txt", false).unwrap();
    assert_eq!(shallow.len(), 1);

    let in_sub = fs.find_files_in("/sub", "?.*", false).unwrap();
    assert_eq!(in_sub.len(), 2);
}

/// Deleting a mounted file only removes it from the tree
#[test]
fn test_delete_mounted_file_keeps_source() {
    let base = TempDir::new().unwrap();
    let saves = TempDir::new().unwrap();
    write(base.path(), "a.txt", "a");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();
    fs.set_write_location(saves.path()).unwrap();

    fs.delete_file("/a.txt").unwrap();

    assert!(fs.get_file("/a.txt").unwrap().is_none());
    assert!(base.path().join("a.txt").exists());
}

/// A file name without legal characters does not fail the mount
#[cfg(unix)]
#[test]
fn test_mount_skips_unnamed_entries() {
    let base = TempDir::new().unwrap();
    write(base.path(), "a.txt", "a");
    write(base.path(), "???", "unnamed");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();

    assert_eq!(fs.read_file("/a.txt").unwrap(), b"a");
    assert_eq!(fs.mount_points().len(), 1);
}

/// Names that clean up to an existing name never shadow it
#[cfg(unix)]
#[test]
fn test_mount_keeps_exact_name_on_collision() {
    let base = TempDir::new().unwrap();
    write(base.path(), "a.txt", "plain");
    write(base.path(), "a?.txt", "question");
    write(base.path(), "a:.txt", "colon");

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();

    assert_eq!(fs.read_file("/a.txt").unwrap(), b"plain");
    fs.refresh().unwrap();
    assert_eq!(fs.read_file("/a.txt").unwrap(), b"plain");
}

/// Symbolic links inside a mounted folder are served like their targets
#[cfg(unix)]
#[test]
fn test_mount_follows_symlinks() {
    use std::os::unix::fs::symlink;

    let target = TempDir::new().unwrap();
    write(target.path(), "file.txt", "linked file");
    write(target.path(), "dir/inner.txt", "linked dir");

    let base = TempDir::new().unwrap();
    symlink(target.path().join("file.txt"), base.path().join("link.txt")).unwrap();
    symlink(target.path().join("dir"), base.path().join("linkdir")).unwrap();

    let mut fs = FileSystem::new();
    fs.mount(base.path(), "/").unwrap();

    assert_eq!(fs.read_file("/link.txt").unwrap(), b"linked file");
    assert_eq!(fs.read_file("/linkdir/inner.txt").unwrap(), b"linked dir");
}

// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use super::{new_fs, test_location};
use crate::adapter::{DIR_MARKER, RepoAdapter};
use crate::client::RemoteClient;
use crate::error::Error;
use crate::fs::FileSystem;
use crate::info::ResourceType;
use crate::memory::MemoryRepository;
use std::sync::Arc;

#[tokio::test]
async fn test_round_trip_large_file() {
    let (_repo, fs) = new_fs().await;
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

    fs.writebytes("/big.bin", &content).await.unwrap();

    assert_eq!(fs.readbytes("/big.bin").await.unwrap(), content);
    assert_eq!(fs.getinfo("/big.bin").await.unwrap().size(), 200_000);
}

#[tokio::test]
async fn test_root_always_exists() {
    let (_repo, fs) = new_fs().await;

    let info = fs.getinfo("/").await.unwrap();
    assert!(info.is_dir());
    assert_eq!(info.name(), "");
    assert!(fs.isempty("/").await.unwrap());
    assert!(fs.listdir("").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_getinfo_and_predicates() {
    let (_repo, fs) = new_fs().await;
    fs.writebytes("/dir/file.txt", b"abc").await.unwrap_err();
    fs.makedir("/dir", false).await.unwrap();
    fs.writebytes("/dir/file.txt", b"abc").await.unwrap();

    let info = fs.getinfo("/dir/./file.txt").await.unwrap();
    assert_eq!(info.resource_type(), ResourceType::File);
    assert_eq!(info.size(), 3);
    assert!(info.modified().is_some());

    assert!(fs.isdir("/dir").await.unwrap());
    assert!(!fs.isfile("/dir").await.unwrap());
    assert!(fs.isfile("/dir/file.txt").await.unwrap());
    assert!(!fs.exists("/nope").await.unwrap());
    assert!(!fs.isdir("/nope").await.unwrap());
    assert!(matches!(
        fs.getinfo("/nope").await,
        Err(Error::ResourceNotFound(p)) if p == "/nope"
    ));
}

#[tokio::test]
async fn test_invalid_paths() {
    let (_repo, fs) = new_fs().await;

    assert!(matches!(fs.getinfo("/../etc").await, Err(Error::InvalidPath(_))));
    assert!(matches!(fs.listdir("a\0b").await, Err(Error::InvalidPath(_))));
}

#[tokio::test]
async fn test_listdir_errors() {
    let (_repo, fs) = new_fs().await;
    assert!(matches!(
        fs.listdir("/absent").await,
        Err(Error::ResourceNotFound(p)) if p == "/absent"
    ));
}

#[tokio::test]
async fn test_makedir() {
    let (repo, fs) = new_fs().await;

    fs.makedir("/a", false).await.unwrap();
    assert!(fs.isdir("/a").await.unwrap());
    assert!(fs.isempty("/a").await.unwrap());
    assert!(fs.listdir("/a").await.unwrap().is_empty());
    assert_eq!(fs.listdir("/").await.unwrap(), vec!["a"]);

    // The marker is what the repository actually holds
    let client = repo.client(test_location());
    assert!(client.inspect_file(&format!("/a/{DIR_MARKER}")).await.is_ok());

    assert!(matches!(
        fs.makedir("/a", false).await,
        Err(Error::DirectoryExists(p)) if p == "/a"
    ));
    fs.makedir("/a", true).await.unwrap();
    fs.makedir("/", true).await.unwrap();
    assert!(matches!(fs.makedir("/", false).await, Err(Error::DirectoryExists(_))));

    assert!(matches!(
        fs.makedir("/x/y", false).await,
        Err(Error::ResourceNotFound(p)) if p == "/x"
    ));

    fs.writebytes("/f", b"").await.unwrap();
    assert!(matches!(fs.makedir("/f", true).await, Err(Error::DirectoryExists(_))));
    assert!(matches!(
        fs.makedir("/f/sub", false).await,
        Err(Error::DirectoryExpected(p)) if p == "/f"
    ));
}

#[tokio::test]
async fn test_marker_paths_are_reserved() {
    let (_repo, fs) = new_fs().await;
    fs.makedir("/d", false).await.unwrap();
    let marker = format!("/d/{DIR_MARKER}");

    assert!(matches!(fs.getinfo(&marker).await, Err(Error::InvalidPath(p)) if p == marker));
    assert!(matches!(fs.exists(&marker).await, Err(Error::InvalidPath(_))));
    assert!(matches!(fs.openbin(&marker, "rb").await, Err(Error::InvalidPath(_))));
    assert!(matches!(fs.remove(&marker).await, Err(Error::InvalidPath(_))));
    assert!(fs.isdir("/d").await.unwrap());

    fs.makedir("/u", false).await.unwrap();
    assert!(matches!(
        fs.writebytes(&format!("/u/{DIR_MARKER}"), b"user data").await,
        Err(Error::InvalidPath(_))
    ));
    assert!(matches!(
        fs.makedir(&format!("/u/{DIR_MARKER}/sub"), false).await,
        Err(Error::InvalidPath(_))
    ));

    fs.writebytes("/f", b"x").await.unwrap();
    assert!(matches!(fs.copy("/f", &marker, true).await, Err(Error::InvalidPath(_))));
    assert!(matches!(
        fs.move_file("/f", &marker, true).await,
        Err(Error::InvalidPath(_))
    ));
    assert_eq!(fs.readbytes("/f").await.unwrap(), b"x");
    assert!(fs.listdir("/d").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove() {
    let (_repo, fs) = new_fs().await;
    fs.makedir("/d", false).await.unwrap();
    fs.writebytes("/d/f", b"x").await.unwrap();

    assert!(matches!(fs.remove("/d").await, Err(Error::FileExpected(p)) if p == "/d"));
    assert!(matches!(fs.remove("/").await, Err(Error::FileExpected(_))));

    fs.remove("/d/f").await.unwrap();
    assert!(!fs.exists("/d/f").await.unwrap());
    // The marker keeps the directory
    assert!(fs.isdir("/d").await.unwrap());
}

#[tokio::test]
async fn test_removedir() {
    let (_repo, fs) = new_fs().await;
    fs.makedir("/d", false).await.unwrap();
    fs.writebytes("/d/f", b"x").await.unwrap();

    assert!(matches!(fs.removedir("/").await, Err(Error::RemoveRoot)));
    assert!(matches!(
        fs.removedir("/d").await,
        Err(Error::DirectoryNotEmpty(p)) if p == "/d"
    ));
    assert!(matches!(
        fs.removedir("/d/f").await,
        Err(Error::DirectoryExpected(_))
    ));
    assert!(matches!(
        fs.removedir("/none").await,
        Err(Error::ResourceNotFound(_))
    ));

    fs.remove("/d/f").await.unwrap();
    fs.removedir("/d").await.unwrap();
    assert!(!fs.exists("/d").await.unwrap());
    assert!(fs.listdir("/").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_openbin_preconditions() {
    let (_repo, fs) = new_fs().await;
    fs.makedir("/d", false).await.unwrap();
    fs.writebytes("/d/f", b"x").await.unwrap();

    assert!(matches!(fs.openbin("/d", "rb").await, Err(Error::FileExpected(_))));
    assert!(matches!(fs.openbin("/d", "wb").await, Err(Error::FileExpected(_))));
    assert!(matches!(fs.openbin("/", "rb").await, Err(Error::FileExpected(_))));
    assert!(matches!(
        fs.openbin("/d/f", "xb").await,
        Err(Error::FileExists(p)) if p == "/d/f"
    ));
    assert!(matches!(
        fs.openbin("/d/g", "r+b").await,
        Err(Error::ResourceNotFound(_))
    ));
    assert!(matches!(
        fs.openbin("/missing/g", "wb").await,
        Err(Error::ResourceNotFound(p)) if p == "/missing"
    ));
    assert!(matches!(fs.openbin("/d/f", "rt").await, Err(Error::InvalidMode(_))));
    assert!(matches!(fs.openbin("/d/f", "q").await, Err(Error::InvalidMode(_))));
}

#[tokio::test]
async fn test_create_parents() {
    let (repo, _) = new_fs().await;
    let location = test_location();
    let fs = RepoAdapter::new(location.clone(), Arc::new(repo.client(location)))
        .with_create_parents(true);

    fs.writebytes("/deep/er/file", b"x").await.unwrap();
    assert!(fs.isdir("/deep/er").await.unwrap());
    assert_eq!(fs.listdir("/deep").await.unwrap(), vec!["er"]);
}

#[tokio::test]
async fn test_upload_and_download() {
    let (_repo, fs) = new_fs().await;

    let mut source: &[u8] = b"streamed bytes";
    assert_eq!(fs.upload("/u", &mut source).await.unwrap(), 14);

    let mut out: Vec<u8> = Vec::new();
    assert_eq!(fs.download("/u", &mut out).await.unwrap(), 14);
    assert_eq!(out, b"streamed bytes");
}

#[tokio::test]
async fn test_copy() {
    let (_repo, fs) = new_fs().await;
    fs.writebytes("/src", b"one").await.unwrap();
    fs.writebytes("/dst", b"two").await.unwrap();
    fs.makedir("/dir", false).await.unwrap();

    assert!(matches!(
        fs.copy("/src", "/dst", false).await,
        Err(Error::DestinationExists(p)) if p == "/dst"
    ));
    assert_eq!(fs.readbytes("/dst").await.unwrap(), b"two");

    fs.copy("/src", "/dst", true).await.unwrap();
    assert_eq!(fs.readbytes("/dst").await.unwrap(), b"one");

    assert!(matches!(fs.copy("/dir", "/x", false).await, Err(Error::FileExpected(_))));
    assert!(matches!(fs.copy("/src", "/dir", true).await, Err(Error::FileExpected(_))));
    assert!(matches!(
        fs.copy("/nothing", "/x", false).await,
        Err(Error::ResourceNotFound(_))
    ));

    fs.copy("/src", "/dir/src", false).await.unwrap();
    assert_eq!(fs.readbytes("/dir/src").await.unwrap(), b"one");
    assert_eq!(fs.readbytes("/src").await.unwrap(), b"one");
}

#[tokio::test]
async fn test_move_file() {
    let (_repo, fs) = new_fs().await;
    fs.writebytes("/a", b"content").await.unwrap();
    fs.makedir("/b", false).await.unwrap();

    fs.move_file("/a", "/b/a", false).await.unwrap();
    assert!(!fs.exists("/a").await.unwrap());
    assert_eq!(fs.readbytes("/b/a").await.unwrap(), b"content");

    // Moving onto itself keeps the file
    fs.move_file("/b/a", "/b/./a", true).await.unwrap();
    assert_eq!(fs.readbytes("/b/a").await.unwrap(), b"content");
}

#[tokio::test]
async fn test_walk_files() {
    let (_repo, fs) = new_fs().await;
    fs.makedir("/a", false).await.unwrap();
    fs.makedir("/a/b", false).await.unwrap();
    fs.makedir("/empty", false).await.unwrap();
    fs.writebytes("/top", b"").await.unwrap();
    fs.writebytes("/a/one", b"").await.unwrap();
    fs.writebytes("/a/b/two", b"").await.unwrap();

    let mut files = fs.walk_files("/").await.unwrap();
    files.sort();
    assert_eq!(files, vec!["/a/b/two", "/a/one", "/top"]);

    assert_eq!(fs.walk_files("/a/b").await.unwrap(), vec!["/a/b/two"]);
}

#[tokio::test]
async fn test_rooted_adapter() {
    let (repo, fs) = new_fs().await;
    fs.makedir("/videos", false).await.unwrap();
    fs.writebytes("/videos/clip.mov", b"mov").await.unwrap();
    fs.writebytes("/outside", b"o").await.unwrap();

    let location = test_location();
    let rooted = RepoAdapter::new(location.clone(), Arc::new(repo.client(location)))
        .with_root("/videos/")
        .unwrap();
    assert_eq!(rooted.root(), "/videos");
    assert_eq!(rooted.to_string(), "<pachfs 'test/videos'>");
    assert_eq!(fs.to_string(), "<pachfs 'test'>");

    assert_eq!(rooted.listdir("/").await.unwrap(), vec!["clip.mov"]);
    assert_eq!(rooted.readbytes("clip.mov").await.unwrap(), b"mov");
    assert!(!rooted.exists("/outside").await.unwrap());

    rooted.writebytes("/new.mov", b"n").await.unwrap();
    assert_eq!(fs.readbytes("/videos/new.mov").await.unwrap(), b"n");

    // Faults name the caller's path, not the repository key
    assert!(matches!(
        rooted.getinfo("/gone").await,
        Err(Error::ResourceNotFound(p)) if p == "/gone"
    ));
}

#[tokio::test]
async fn test_meta_and_setinfo() {
    let (_repo, fs) = new_fs().await;
    let meta = fs.meta();
    assert!(meta.network);
    assert!(!meta.thread_safe);
    assert!(!meta.read_only);
    assert!(!meta.case_insensitive);

    fs.writebytes("/f", b"x").await.unwrap();
    let info = serde_json::json!({"details": {"modified": 0}});
    fs.setinfo("/f", &info).await.unwrap();
    assert!(matches!(
        fs.setinfo("/g", &info).await,
        Err(Error::ResourceNotFound(_))
    ));
}

#[tokio::test]
async fn test_scandir_namespaces() {
    let (_repo, fs) = new_fs().await;
    fs.makedir("/d", false).await.unwrap();
    fs.writebytes("/f", b"12345").await.unwrap();

    let entries = fs.scandir("/").await.unwrap();
    let namespaces: Vec<_> = entries.iter().map(|i| i.to_namespaces()).collect();
    assert_eq!(namespaces[0]["basic"]["name"], "d");
    assert_eq!(namespaces[0]["basic"]["is_dir"], true);
    assert_eq!(namespaces[1]["basic"]["name"], "f");
    assert_eq!(namespaces[1]["details"]["size"], 5);
    assert_eq!(namespaces[1]["details"]["type"], 2);
}

#[tokio::test]
async fn test_separate_branches_are_isolated() {
    let repo = MemoryRepository::new();
    let master = test_location();
    let dev = crate::location::RepoLocation::new("default", "test", "dev").unwrap();
    repo.create_branch(&master).await;
    repo.create_branch(&dev).await;

    let on_master = RepoAdapter::new(master.clone(), Arc::new(repo.client(master)));
    let on_dev = RepoAdapter::new(dev.clone(), Arc::new(repo.client(dev)));

    on_master.writebytes("/only-master", b"m").await.unwrap();
    assert!(!on_dev.exists("/only-master").await.unwrap());
    assert_eq!(on_dev.location().branch(), "dev");
}

// 文件网关测试
// 远程目录树由 MemoryFs 模拟

mod common;

use std::io::{Cursor, Read};
use std::sync::Arc;

use common::MemoryFs;
use tokio::io::AsyncReadExt;
use vpsmaster::models::settings::SftpSettings;
use vpsmaster::models::sftp::SortBy;
use vpsmaster::services::sftp::{FsError, Gateway};

const HOME: &str = "/home/alice";

async fn gateway_with(fs: Arc<MemoryFs>, settings: SftpSettings) -> Gateway {
    Gateway::open(fs, &settings).await.unwrap()
}

async fn gateway() -> (Arc<MemoryFs>, Gateway) {
    let fs = Arc::new(MemoryFs::new(HOME));
    let gw = gateway_with(fs.clone(), SftpSettings::default()).await;
    (fs, gw)
}

fn names(entries: &[vpsmaster::models::sftp::FileEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[tokio::test]
async fn home_is_resolved_on_open() {
    let (_, gw) = gateway().await;
    assert_eq!(gw.home(), HOME);
}

#[tokio::test]
async fn listing_puts_directories_first() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/b.txt", b"bb");
    fs.add_file("/home/alice/A.md", b"a");
    fs.add_dir("/home/alice/zeta");
    fs.add_dir("/home/alice/alpha");
    fs.add_file("/home/alice/.bashrc", b"export X=1");

    let entries = gw.list(".", SortBy::Name, true).await.unwrap();
    assert_eq!(names(&entries), vec!["alpha", "zeta", ".bashrc", "A.md", "b.txt"]);
    assert!(entries[0].is_dir);

    let visible = gw.list("", SortBy::Name, false).await.unwrap();
    assert_eq!(names(&visible), vec!["alpha", "zeta", "A.md", "b.txt"]);

    let by_size = gw.list(HOME, SortBy::Size, false).await.unwrap();
    assert_eq!(names(&by_size), vec!["alpha", "zeta", "b.txt", "A.md"]);
}

#[tokio::test]
async fn listing_errors_are_classified() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/notes.txt", b"x");
    fs.add_dir("/root");
    fs.deny("/root");

    assert!(matches!(
        gw.list("missing", SortBy::Name, true).await,
        Err(FsError::NotFound(_))
    ));
    assert!(matches!(
        gw.list("notes.txt", SortBy::Name, true).await,
        Err(FsError::NotADirectory(_))
    ));
    assert!(matches!(
        gw.list("/root", SortBy::Name, true).await,
        Err(FsError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn mkdir_then_delete_removes_directory() {
    let (_, gw) = gateway().await;

    gw.mkdir("projects").await.unwrap();
    let entries = gw.list(".", SortBy::Name, true).await.unwrap();
    assert_eq!(names(&entries), vec!["projects"]);

    gw.delete("projects").await.unwrap();
    let entries = gw.list(".", SortBy::Name, true).await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn mkdir_rejects_existing_and_orphaned_paths() {
    let (fs, gw) = gateway().await;
    fs.add_dir("/home/alice/src");

    assert!(matches!(gw.mkdir("src").await, Err(FsError::AlreadyExists(_))));
    assert!(matches!(
        gw.mkdir("a/b/c").await,
        Err(FsError::ParentMissing(p)) if p == "/home/alice/a/b"
    ));
}

#[tokio::test]
async fn write_then_read_round_trips() {
    let (fs, gw) = gateway().await;
    let content = "server {\n    listen 80;\n}\n# ünïcødé\n";

    let size = gw.write("nginx.conf", content).await.unwrap();
    assert_eq!(size, content.len() as u64);

    let read = gw.read("nginx.conf").await.unwrap();
    assert_eq!(read.content, content);
    assert_eq!(read.size, content.len() as u64);
    assert_eq!(fs.file("/home/alice/nginx.conf").unwrap(), content.as_bytes());

    // 覆盖写入会截断
    gw.write("nginx.conf", "short").await.unwrap();
    assert_eq!(gw.read("nginx.conf").await.unwrap().content, "short");
}

#[tokio::test]
async fn read_rejects_directories_and_large_files() {
    let fs = Arc::new(MemoryFs::new(HOME));
    fs.add_dir("/home/alice/logs");
    fs.add_file("/home/alice/big.log", &vec![b'x'; 64]);
    let gw = gateway_with(
        fs,
        SftpSettings {
            max_edit_bytes: 32,
            ..Default::default()
        },
    )
    .await;

    assert!(matches!(gw.read("logs").await, Err(FsError::IsADirectory(_))));
    assert!(matches!(
        gw.read("big.log").await,
        Err(FsError::TooLarge { size: 64, limit: 32 })
    ));
    assert!(matches!(gw.read("nope").await, Err(FsError::NotFound(_))));
}

#[tokio::test]
async fn read_replaces_invalid_utf8() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/bin.dat", &[b'o', b'k', 0xff, 0xfe]);
    let read = gw.read("bin.dat").await.unwrap();
    assert!(read.content.starts_with("ok"));
    assert!(read.content.contains('\u{FFFD}'));
    assert_eq!(read.size, 4);
}

#[tokio::test]
async fn write_errors_are_classified() {
    let (fs, gw) = gateway().await;
    fs.add_dir("/home/alice/site");

    assert!(matches!(gw.write("site", "x").await, Err(FsError::IsADirectory(_))));
    assert!(matches!(
        gw.write("missing/dir/file.txt", "x").await,
        Err(FsError::ParentMissing(_))
    ));
    assert!(matches!(gw.write("/", "x").await, Err(FsError::InvalidPath(_))));
}

#[tokio::test]
async fn rename_onto_existing_name_leaves_both_files() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/a.txt", b"first");
    fs.add_file("/home/alice/b.txt", b"second");

    let err = gw.rename("a.txt", "b.txt").await.unwrap_err();
    assert!(matches!(err, FsError::TargetExists(p) if p == "/home/alice/b.txt"));
    assert_eq!(fs.file("/home/alice/a.txt").unwrap(), b"first");
    assert_eq!(fs.file("/home/alice/b.txt").unwrap(), b"second");

    gw.rename("a.txt", "c.txt").await.unwrap();
    assert!(!fs.contains("/home/alice/a.txt"));
    assert_eq!(fs.file("/home/alice/c.txt").unwrap(), b"first");

    assert!(matches!(
        gw.rename("ghost.txt", "d.txt").await,
        Err(FsError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_recurses_without_following_symlinks() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/app/src/main.rs", b"fn main() {}");
    fs.add_file("/home/alice/app/README", b"hi");
    fs.add_file("/srv/data/keep.db", b"precious");
    fs.add_symlink("/home/alice/app/data", "/srv/data");

    gw.delete("app").await.unwrap();
    assert!(!fs.contains("/home/alice/app"));
    assert!(!fs.contains("/home/alice/app/src/main.rs"));
    assert_eq!(fs.file("/srv/data/keep.db").unwrap(), b"precious");
}

#[tokio::test]
async fn delete_refuses_root_and_home() {
    let (_, gw) = gateway().await;
    assert!(matches!(gw.delete("/").await, Err(FsError::InvalidPath(_))));
    assert!(matches!(gw.delete(".").await, Err(FsError::InvalidPath(_))));
    assert!(matches!(gw.delete("nope").await, Err(FsError::NotFound(_))));
}

#[tokio::test]
async fn batch_delete_stops_at_first_failure() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/1.txt", b"1");
    fs.add_file("/home/alice/2.txt", b"2");
    fs.add_file("/home/alice/3.txt", b"3");
    fs.deny("/home/alice/2.txt");

    let paths: Vec<String> = ["1.txt", "2.txt", "3.txt"].iter().map(|s| s.to_string()).collect();
    let outcome = gw.delete_many(&paths).await;

    assert_eq!(outcome.deleted, vec!["1.txt"]);
    let (failed, err) = outcome.failed.unwrap();
    assert_eq!(failed, "2.txt");
    assert!(matches!(err, FsError::PermissionDenied(_)));
    assert!(fs.contains("/home/alice/3.txt"));
}

#[tokio::test]
async fn exists_reports_presence() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/here", b"");
    assert!(gw.exists("here").await.unwrap());
    assert!(!gw.exists("gone").await.unwrap());
}

#[tokio::test]
async fn upload_keeps_only_last_name_component() {
    let (fs, gw) = gateway().await;
    fs.add_dir("/home/alice/uploads");

    let outcome = gw
        .upload("uploads", "../../etc/passwd", None, &b"payload"[..])
        .await
        .unwrap();
    assert_eq!(outcome.filename, "passwd");
    assert_eq!(outcome.path, "/home/alice/uploads/passwd");
    assert_eq!(outcome.size, 7);
    assert_eq!(fs.file("/home/alice/uploads/passwd").unwrap(), b"payload");
}

#[tokio::test]
async fn upload_with_subpath_creates_directories() {
    let (fs, gw) = gateway().await;

    let outcome = gw
        .upload(".", "c.txt", Some("site\\assets\\css\\c.txt"), &b"body{}"[..])
        .await
        .unwrap();
    assert_eq!(outcome.path, "/home/alice/site/assets/css/c.txt");
    assert!(fs.contains("/home/alice/site/assets"));
    assert_eq!(fs.file("/home/alice/site/assets/css/c.txt").unwrap(), b"body{}");

    assert!(matches!(
        gw.upload(".", "x", Some("../escape.txt"), &b"x"[..]).await,
        Err(FsError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn oversized_upload_leaves_no_partial_file() {
    let fs = Arc::new(MemoryFs::new(HOME));
    let gw = gateway_with(
        fs.clone(),
        SftpSettings {
            max_upload_bytes: 4,
            ..Default::default()
        },
    )
    .await;

    let err = gw
        .upload(".", "big.bin", None, &b"0123456789"[..])
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::TooLarge { limit: 4, .. }));
    assert!(!fs.contains("/home/alice/big.bin"));
}

#[tokio::test]
async fn download_streams_file_bytes() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/backup.tar", b"tarball");
    fs.add_dir("/home/alice/dir");

    let mut download = gw.download("backup.tar").await.unwrap();
    assert_eq!(download.file_name, "backup.tar");
    assert_eq!(download.size, 7);
    let mut body = Vec::new();
    download.reader.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"tarball");

    assert!(matches!(gw.download("dir").await, Err(FsError::IsADirectory(_))));
}

#[tokio::test]
async fn download_dir_skips_heavy_directories() {
    let (fs, gw) = gateway().await;
    fs.add_file("/home/alice/proj/index.js", b"console.log(1)");
    fs.add_file("/home/alice/proj/node_modules/x/index.js", b"dep");
    fs.add_file("/home/alice/proj/logs/app.log", b"log");
    fs.add_file("/home/alice/proj/lib/util.js", b"util");

    let archive = gw
        .download_dir("proj", &["logs".to_string()])
        .await
        .unwrap();
    assert_eq!(archive.file_name, "proj.zip");

    let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
    let mut names: Vec<String> = zip.file_names().map(String::from).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["proj/", "proj/index.js", "proj/lib/", "proj/lib/util.js"]
    );

    let mut content = String::new();
    zip.by_name("proj/lib/util.js")
        .unwrap()
        .read_to_string(&mut content)
        .unwrap();
    assert_eq!(content, "util");
}

#[tokio::test]
async fn root_restriction_is_enforced() {
    let fs = Arc::new(MemoryFs::new(HOME));
    fs.add_file("/etc/passwd", b"root:x:0:0");
    let gw = gateway_with(
        fs,
        SftpSettings {
            root: Some(HOME.to_string()),
            ..Default::default()
        },
    )
    .await;

    assert!(matches!(gw.read("/etc/passwd").await, Err(FsError::OutsideRoot(_))));
    assert!(matches!(
        gw.list("..", SortBy::Name, true).await,
        Err(FsError::OutsideRoot(_))
    ));
    assert!(gw.list(".", SortBy::Name, true).await.is_ok());
}

async fn rooted_gateway() -> (Arc<MemoryFs>, Gateway) {
    let fs = Arc::new(MemoryFs::new(HOME));
    fs.add_file("/etc/shadow", b"SECRET");
    fs.add_symlink("/home/alice/link", "/etc/shadow");
    fs.add_symlink("/home/alice/out", "/etc");
    let gw = gateway_with(
        fs.clone(),
        SftpSettings {
            root: Some(HOME.to_string()),
            ..Default::default()
        },
    )
    .await;
    (fs, gw)
}

fn outside<T>(result: Result<T, FsError>) -> bool {
    matches!(result, Err(FsError::OutsideRoot(_)))
}

#[tokio::test]
async fn symlinks_cannot_escape_root_for_reads() {
    let (_, gw) = rooted_gateway().await;

    assert!(outside(gw.read("link").await));
    assert!(outside(gw.download("link").await));
    assert!(outside(gw.list("out", SortBy::Name, true).await));
    assert!(outside(gw.download_dir("out", &[]).await));
    assert!(outside(gw.exists("out/shadow").await));
}

#[tokio::test]
async fn symlinks_cannot_escape_root_for_writes() {
    let (fs, gw) = rooted_gateway().await;

    assert!(outside(gw.write("out/new.txt", "x").await));
    assert!(outside(gw.write("link", "overwritten").await));
    assert!(outside(gw.mkdir("out/x").await));
    assert!(outside(gw.rename("out/shadow", "stolen").await));
    assert!(outside(gw.delete("out/shadow").await));
    assert!(outside(gw.upload("out", "a.txt", None, &b"a"[..]).await));
    assert!(outside(
        gw.upload(".", "a.txt", Some("out/sub/a.txt"), &b"a"[..]).await
    ));

    assert_eq!(fs.file("/etc/shadow").unwrap(), b"SECRET");
    assert!(!fs.contains("/etc/new.txt"));
    assert!(!fs.contains("/etc/x"));
    assert!(!fs.contains("/etc/a.txt"));
    assert!(!fs.contains("/etc/sub"));
}

#[tokio::test]
async fn dangling_link_under_root_is_not_written_through() {
    let (fs, gw) = rooted_gateway().await;
    fs.add_symlink("/home/alice/dangling", "/etc/created");

    assert!(outside(gw.write("dangling", "x").await));
    assert!(!fs.contains("/etc/created"));
}

#[tokio::test]
async fn links_inside_root_still_work() {
    let (fs, gw) = rooted_gateway().await;
    fs.add_file("/home/alice/docs/a.txt", b"notes");
    fs.add_symlink("/home/alice/latest", "/home/alice/docs");

    assert_eq!(gw.read("latest/a.txt").await.unwrap().content, "notes");

    // 删除链接只删链接本身
    gw.delete("link").await.unwrap();
    assert!(!fs.contains("/home/alice/link"));
    assert_eq!(fs.file("/etc/shadow").unwrap(), b"SECRET");
}

#[tokio::test]
async fn failed_upload_keeps_existing_file() {
    let fs = Arc::new(MemoryFs::new(HOME));
    fs.add_file("/home/alice/big.bin", b"old");
    let gw = gateway_with(
        fs.clone(),
        SftpSettings {
            max_upload_bytes: 4,
            ..Default::default()
        },
    )
    .await;

    let err = gw
        .upload(".", "big.bin", None, &b"0123456789"[..])
        .await
        .unwrap_err();
    assert!(matches!(err, FsError::TooLarge { limit: 4, .. }));
    assert!(fs.contains("/home/alice/big.bin"));
}

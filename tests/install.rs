// tests/install.rs

//! End-to-end install tests against a throwaway install area.

mod common;

use common::{
    Area, CorruptingFetcher, FaultyExtractor, RecordingHooks, TruncatingExtractor, files_below,
    names, pkg, spec,
};
use flate2::Compression;
use flate2::write::GzEncoder;
use sitepkg::db::models::PostInstallStatus;
use sitepkg::filesystem::RelocationMap;
use sitepkg::scriptlet::ShellHookRunner;
use sitepkg::{Error, InstallOptions, PackageFilter};
use std::fs;
use std::sync::atomic::Ordering;

/// a requires b and c, b requires d
fn diamond(area: &mut Area) {
    area.publish(pkg("a", "1.0", &["b", "c"]));
    area.publish(pkg("b", "1.0", &["d"]));
    area.publish(pkg("c", "1.0", &[]));
    area.publish(pkg("d", "1.0", &[]));
}

#[test]
fn test_install_applies_dependencies_first() {
    let mut area = Area::new();
    diamond(&mut area);
    let installer = area.installer();

    let plan = installer
        .dry_run_install(&[spec("a")], &InstallOptions::default())
        .unwrap();
    assert_eq!(names(plan.packages()), vec!["c", "d", "b", "a"]);

    let report = installer
        .install(&[spec("a")], &InstallOptions::default())
        .unwrap();
    assert_eq!(names(report.applied()), vec!["c", "d", "b", "a"]);
    assert!(report.is_success());

    for name in ["a", "b", "c", "d"] {
        assert!(area.path(&format!("opt/sw/{}/bin/{}", name, name)).is_file());
        assert!(area.path(&format!("opt/sw/{}/share/README", name)).is_file());
    }
}

#[test]
fn test_dry_run_touches_nothing() {
    let mut area = Area::new();
    diamond(&mut area);
    let installer = area.installer();

    let plan = installer
        .dry_run_install(&[spec("a")], &InstallOptions::default())
        .unwrap();
    assert_eq!(plan.len(), 4);
    assert!(!area.path("opt").exists());
    for pkg in plan.iter() {
        assert!(!area.installed(pkg));
    }
}

#[test]
fn test_cyclic_requirements_install_both() {
    let mut area = Area::new();
    let a = area.publish(pkg("a", "1.0", &["b"]));
    let b = area.publish(pkg("b", "1.0", &["a"]));

    let report = area
        .installer()
        .install(&[spec("a")], &InstallOptions::default())
        .unwrap();
    assert_eq!(names(report.applied()), vec!["b", "a"]);
    assert!(area.installed(&a));
    assert!(area.installed(&b));
}

#[test]
fn test_reinstall_is_a_no_op() {
    let mut area = Area::new();
    diamond(&mut area);
    let installer = area.installer();

    let first = installer
        .install(&[spec("a")], &InstallOptions::default())
        .unwrap();
    assert_eq!(first.applied().count(), 4);

    let second = installer
        .install(&[spec("a")], &InstallOptions::default())
        .unwrap();
    assert_eq!(second.applied().count(), 0);
    assert_eq!(names(second.skipped()), vec!["a"]);
    assert!(second.is_success());
}

#[test]
fn test_installed_dependency_is_not_replanned() {
    let mut area = Area::new();
    diamond(&mut area);
    let installer = area.installer();

    installer
        .install(&[spec("d")], &InstallOptions::default())
        .unwrap();
    let plan = installer
        .dry_run_install(&[spec("b")], &InstallOptions::default())
        .unwrap();
    assert_eq!(names(plan.packages()), vec!["b"]);
}

#[test]
fn test_nodeps_installs_only_targets() {
    let mut area = Area::new();
    diamond(&mut area);
    let installer = area.installer();

    let opts = InstallOptions {
        nodeps: true,
        ..Default::default()
    };
    let report = installer.install(&[spec("a")], &opts).unwrap();
    assert_eq!(names(report.applied()), vec!["a"]);
    assert!(!area.path("opt/sw/b").exists());
}

#[test]
fn test_unknown_spec_is_reported_missing() {
    let mut area = Area::new();
    area.publish(pkg("c", "1.0", &[]));

    let report = area
        .installer()
        .install(&[spec("nope"), spec("c")], &InstallOptions::default())
        .unwrap();
    assert_eq!(report.missing(), ["nope".to_string()]);
    assert_eq!(names(report.applied()), vec!["c"]);
    assert!(!report.is_success());
}

#[test]
fn test_failed_extraction_rolls_back_the_package() {
    let mut area = Area::new();
    let payload: Vec<(String, Vec<u8>)> = (0..5)
        .map(|i| (format!("opt/sw/a/lib/part{}", i), vec![b'x'; 16 + i]))
        .collect();
    let a = area.publish_with(pkg("a", "1.0", &["b"]), &payload, None);
    let b = area.publish(pkg("b", "1.0", &[]));

    let installer = area
        .installer()
        .with_extractor(Box::new(FaultyExtractor::new("a-", 3)));
    let err = installer
        .install(&[spec("a")], &InstallOptions::default())
        .unwrap_err();

    match err {
        Error::InstallError {
            package,
            cause,
            report,
        } => {
            assert_eq!(package, "a-1.0-1");
            assert!(matches!(*cause, Error::ExtractionError(_)));
            assert_eq!(names(report.applied()), vec!["b"]);
            assert_eq!(names(report.failed()), vec!["a"]);
        }
        other => panic!("unexpected error: {}", other),
    }

    assert!(files_below(&area.path("opt/sw/a")).is_empty());
    assert!(!area.path("opt/sw/a").exists());
    assert!(!area.installed(&a));

    // packages applied before the failure stay
    assert!(area.installed(&b));
    assert!(area.path("opt/sw/b/bin/b").is_file());
}

#[test]
fn test_failed_verification_drops_the_record() {
    let mut area = Area::new();
    let a = area.publish(pkg("a", "1.0", &[]));

    let installer = area
        .installer()
        .with_extractor(Box::new(TruncatingExtractor::new()));
    let err = installer
        .install(&[spec("a")], &InstallOptions::default())
        .unwrap_err();

    match err {
        Error::InstallError { cause, report, .. } => {
            assert!(matches!(*cause, Error::ExtractionError(ref msg) if msg.contains("size")));
            assert_eq!(names(report.failed()), vec!["a"]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!area.installed(&a));
    assert!(installer.list(&PackageFilter::all()).unwrap().is_empty());
    assert!(!area.path("opt").exists());
}

#[test]
fn test_payload_cannot_write_through_a_symlink() {
    let mut area = Area::new();
    let outside = area.dir.path().join("outside");
    fs::create_dir(&outside).unwrap();

    let link_target = outside.clone();
    let evil = area.publish_built(pkg("evil", "1.0", &[]), move |artifact| {
        let file = fs::File::create(artifact).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

        let mut link = tar::Header::new_gnu();
        link.set_entry_type(tar::EntryType::Symlink);
        link.set_size(0);
        link.set_mode(0o777);
        link.set_link_name(&link_target).unwrap();
        builder
            .append_data(&mut link, "opt/sw/evil/link", std::io::empty())
            .unwrap();

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(7);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, "opt/sw/evil/link/escaped", &b"escaped"[..])
            .unwrap();

        builder.into_inner().unwrap().finish().unwrap();
    });

    let err = area
        .installer()
        .install(&[spec("evil")], &InstallOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InstallError { ref cause, .. } if matches!(**cause, Error::ExtractionError(_))
    ));

    assert!(!outside.join("escaped").exists());
    assert!(files_below(&outside).is_empty());
    assert!(!area.path("opt").exists());
    assert!(!area.installed(&evil));
}

#[test]
fn test_existing_files_need_overwrite() {
    let mut area = Area::new();
    let shared = vec![("opt/sw/common/etc/setup.sh".to_string(), b"first".to_vec())];
    let x = area.publish_with(pkg("x", "1.0", &[]), &shared, None);
    let replacement = vec![("opt/sw/common/etc/setup.sh".to_string(), b"second".to_vec())];
    let y = area.publish_with(pkg("y", "1.0", &[]), &replacement, None);
    let installer = area.installer();

    installer
        .install(&[spec("x")], &InstallOptions::default())
        .unwrap();
    let err = installer
        .install(&[spec("y")], &InstallOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InstallError { ref cause, .. } if matches!(**cause, Error::ExtractionError(_))
    ));
    assert!(area.installed(&x));
    assert!(!area.installed(&y));
    assert_eq!(fs::read(area.path("opt/sw/common/etc/setup.sh")).unwrap(), b"first");

    let opts = InstallOptions {
        overwrite: true,
        ..Default::default()
    };
    installer.install(&[spec("y")], &opts).unwrap();
    assert!(area.installed(&y));
    assert_eq!(fs::read(area.path("opt/sw/common/etc/setup.sh")).unwrap(), b"second");
}

#[test]
fn test_just_db_registers_without_files() {
    let mut area = Area::new();
    let h = area.publish_with_hook(pkg("h", "1.0", &[]), "exit 0\n");
    let hooks = RecordingHooks::default();
    let installer = area.installer().with_hook_runner(Box::new(hooks.clone()));

    let opts = InstallOptions {
        just_db: true,
        ..Default::default()
    };
    installer.install(&[spec("h")], &opts).unwrap();

    assert!(area.installed(&h));
    assert!(!area.path("opt/sw/h").exists());
    assert!(hooks.calls().is_empty());

    let registered: Vec<String> = installer
        .db()
        .file_entries(&h)
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert!(registered.contains(&"/opt/sw/h/bin/h".to_string()));
}

#[test]
fn test_relocated_install() {
    let mut area = Area::new();
    let r = area.publish(pkg("r", "1.0", &[]));
    let installer = area
        .installer()
        .with_relocation(RelocationMap::from_pairs([("/opt/sw", "/lhcb")]).unwrap());

    installer
        .install(&[spec("r")], &InstallOptions::default())
        .unwrap();
    assert!(area.path("lhcb/r/bin/r").is_file());
    assert!(!area.path("opt").exists());

    let files = installer.db().file_entries(&r).unwrap();
    assert!(files.iter().any(|f| f.path == "/lhcb/r/share/README" && f.relocated));
}

#[test]
fn test_hook_status_is_recorded() {
    let mut area = Area::new();
    let plain = area.publish(pkg("plain", "1.0", &[]));
    let hooked = area.publish_with_hook(pkg("hooked", "1.0", &[]), "true\n");
    let hooks = RecordingHooks::default();
    let installer = area.installer().with_hook_runner(Box::new(hooks.clone()));

    let report = installer
        .install(&[spec("plain"), spec("hooked")], &InstallOptions::default())
        .unwrap();

    assert_eq!(hooks.calls(), vec!["hooked".to_string()]);
    let db = installer.db();
    assert_eq!(
        db.post_install_status(&plain).unwrap(),
        Some(PostInstallStatus::NotRun)
    );
    assert_eq!(
        db.post_install_status(&hooked).unwrap(),
        Some(PostInstallStatus::Success)
    );
    assert_eq!(report.outcome_of(&plain).unwrap().hook, None);
    assert_eq!(
        report.outcome_of(&hooked).unwrap().hook,
        Some(PostInstallStatus::Success)
    );
}

#[test]
fn test_failing_hook_keeps_the_package() {
    let mut area = Area::new();
    let hooked = area.publish_with_hook(pkg("hooked", "1.0", &[]), "exit 1\n");
    let installer = area
        .installer()
        .with_hook_runner(Box::new(RecordingHooks::failing()));

    let report = installer
        .install(&[spec("hooked")], &InstallOptions::default())
        .unwrap();

    assert!(report.is_success());
    assert_eq!(names(report.hook_failures()), vec!["hooked"]);
    assert!(area.installed(&hooked));
    assert!(area.path("opt/sw/hooked/bin/hooked").is_file());
    assert_eq!(
        installer.db().post_install_status(&hooked).unwrap(),
        Some(PostInstallStatus::Error)
    );
}

#[test]
fn test_shell_hook_sees_install_prefix() {
    let mut area = Area::new();
    let script = "echo \"$SITEPKG_PACKAGE_NAME $SITEPKG_PACKAGE_VERSION\" > \"$SITEPKG_INSTALL_PREFIX/hook-ran\"\n";
    let s = area.publish_with_hook(pkg("s", "2.5", &[]), script);
    let installer = area
        .installer()
        .with_hook_runner(Box::new(ShellHookRunner::new()));

    installer
        .install(&[spec("s")], &InstallOptions::default())
        .unwrap();

    let marker = fs::read_to_string(area.path("opt/sw/s/hook-ran")).unwrap();
    assert_eq!(marker.trim(), "s 2.5");
    assert_eq!(
        installer.db().post_install_status(&s).unwrap(),
        Some(PostInstallStatus::Success)
    );
}

#[test]
fn test_fetched_artifacts_are_cleaned_up() {
    let mut area = Area::new();
    diamond(&mut area);

    area.installer()
        .install(&[spec("a")], &InstallOptions::default())
        .unwrap();
    assert!(files_below(&area.tmp_dir).is_empty());
    // the repository copy is never touched
    for pkg in area.packages() {
        assert!(area.artifact_of(pkg).is_file());
    }
}

#[test]
fn test_cached_artifacts_are_used_and_kept() {
    let mut area = Area::new();
    let c = area.publish(pkg("c", "1.0", &[]));

    let cache = area.dir.path().join("cache");
    fs::create_dir_all(cache.join("nested")).unwrap();
    let cached = cache.join("nested").join(c.artifact_name());
    fs::rename(area.artifact_of(&c), &cached).unwrap();

    let installer = area.installer().with_cache_dirs(vec![cache.clone()]);
    installer
        .install(&[spec("c")], &InstallOptions::default())
        .unwrap();

    assert!(area.installed(&c));
    assert!(cached.is_file());
    assert!(files_below(&area.tmp_dir).is_empty());
}

#[test]
fn test_bad_artifact_is_fetched_again() {
    let mut area = Area::new();
    let c = area.publish(pkg("c", "1.0", &[]));

    let fetcher = CorruptingFetcher::new(1);
    let fetches = fetcher.fetches.clone();
    let installer = area.installer().with_fetcher(Box::new(fetcher));

    installer
        .install(&[spec("c")], &InstallOptions::default())
        .unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert!(area.installed(&c));
}

#[test]
fn test_artifact_failing_twice_is_rejected() {
    let mut area = Area::new();
    let c = area.publish(pkg("c", "1.0", &[]));

    let fetcher = CorruptingFetcher::new(2);
    let fetches = fetcher.fetches.clone();
    let installer = area.installer().with_fetcher(Box::new(fetcher));

    let err = installer
        .install(&[spec("c")], &InstallOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InstallError { ref cause, .. } if matches!(**cause, Error::ArtifactValidationError(_))
    ));
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert!(!area.installed(&c));
    assert!(!area.path("opt").exists());
    assert!(files_below(&area.tmp_dir).is_empty());
}

#[test]
fn test_unchecked_artifact_is_sanity_checked() {
    let mut area = Area::new();
    let u = area.publish_unchecked(pkg("u", "1.0", &[]));
    assert!(u.checksum.is_none());

    let fetcher = CorruptingFetcher::new(1);
    let fetches = fetcher.fetches.clone();
    let installer = area.installer().with_fetcher(Box::new(fetcher));

    installer
        .install(&[spec("u")], &InstallOptions::default())
        .unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
    assert!(area.installed(&u));
    assert!(area.path("opt/sw/u/bin/u").is_file());
}

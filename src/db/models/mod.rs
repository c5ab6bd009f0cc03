// src/db/models/mod.rs

//! Data models for the local package database
//!
//! Each struct maps to one table and carries its own insert/find/delete
//! helpers, all taking a plain `&Connection` so they work inside a
//! transaction as well.

mod file_entry;
mod package_entry;
mod provide_entry;
mod requirement_entry;

pub use file_entry::{FileEntry, FileKind};
pub use package_entry::{PackageEntry, PostInstallStatus};
pub use provide_entry::ProvideEntry;
pub use requirement_entry::RequirementEntry;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::package::{Package, Provide, Requirement};
    use crate::version::Comparator;
    use rusqlite::Connection;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON").unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_package_entry_crud() {
        let conn = create_test_db();
        let pkg = Package::new("gaudi", "28.1", "2");

        let mut entry = PackageEntry::from_package(&pkg);
        let id = entry.insert(&conn).unwrap();

        let found = PackageEntry::find_by_nvr(&conn, "gaudi", "28.1", "2")
            .unwrap()
            .unwrap();
        assert_eq!(found.id, Some(id));
        assert_eq!(found.post_install_status, PostInstallStatus::NotRun);
        assert!(found.installed_at.is_some());

        PackageEntry::set_post_install_status(&conn, id, PostInstallStatus::Error).unwrap();
        let found = PackageEntry::find_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(found.post_install_status, PostInstallStatus::Error);

        PackageEntry::delete(&conn, id).unwrap();
        assert!(PackageEntry::find_by_id(&conn, id).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_nvr_rejected() {
        let conn = create_test_db();
        let pkg = Package::new("gaudi", "28.1", "2");
        PackageEntry::from_package(&pkg).insert(&conn).unwrap();
        assert!(PackageEntry::from_package(&pkg).insert(&conn).is_err());
    }

    #[test]
    fn test_load_package_roundtrips_edges() {
        let conn = create_test_db();
        let pkg = Package::new("gaudi", "28.1", "2");
        let id = PackageEntry::from_package(&pkg).insert(&conn).unwrap();

        let req = Requirement::versioned("root", Comparator::Ge, "6.0", None);
        RequirementEntry::from_requirement(id, &req).insert(&conn).unwrap();
        RequirementEntry::from_requirement(id, &Requirement::new("boost"))
            .insert(&conn)
            .unwrap();
        ProvideEntry::from_provide(id, &Provide::new("gaudi-python"))
            .insert(&conn)
            .unwrap();

        let mut file = FileEntry::new("/lhcb/gaudi/bin/gaudirun.py", FileKind::File);
        file.size = 42;
        file.insert(&conn, id).unwrap();

        let entry = PackageEntry::find_by_id(&conn, id).unwrap().unwrap();
        let loaded = entry.load_package(&conn).unwrap();
        assert_eq!(loaded, pkg);
        assert_eq!(loaded.requires, vec![req, Requirement::new("boost")]);
        assert_eq!(loaded.provides, vec![Provide::new("gaudi-python")]);
        assert_eq!(loaded.file_list, vec!["/lhcb/gaudi/bin/gaudirun.py"]);
    }

    #[test]
    fn test_candidates_by_name_and_provide() {
        let conn = create_test_db();
        let a = PackageEntry::from_package(&Package::new("a", "1", "1"))
            .insert(&conn)
            .unwrap();
        let b = PackageEntry::from_package(&Package::new("b", "1", "1"))
            .insert(&conn)
            .unwrap();
        ProvideEntry::from_provide(b, &Provide::new("a")).insert(&conn).unwrap();

        assert_eq!(ProvideEntry::find_candidate_packages(&conn, "a").unwrap(), vec![a, b]);
        assert!(ProvideEntry::find_candidate_packages(&conn, "zzz").unwrap().is_empty());
    }

    #[test]
    fn test_delete_cascades_files() {
        let conn = create_test_db();
        let id = PackageEntry::from_package(&Package::new("a", "1", "1"))
            .insert(&conn)
            .unwrap();
        FileEntry::new("/a/file", FileKind::File).insert(&conn, id).unwrap();
        assert_eq!(FileEntry::find_owners(&conn, "/a/file").unwrap(), vec![id]);

        PackageEntry::delete(&conn, id).unwrap();
        assert!(FileEntry::find_by_package(&conn, id).unwrap().is_empty());
    }
}

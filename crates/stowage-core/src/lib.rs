//! Generic repositories and an audit-stamping unit of work.
//!
//! `stowage-core` layers three things over the query abstraction in
//! `stowage-db`:
//!
//! - **repositories** ([`Repository`], [`ReadOnlyRepository`]) exposing a
//!   filtered, ordered, paged query surface and staged writes over one
//!   entity type;
//! - **capability-driven deletes** — entity types tag themselves
//!   soft- or hard-deletable at compile time, and reads exclude
//!   soft-deleted rows by default;
//! - **a unit of work** ([`Session`]) that stamps creation, modification
//!   and deletion metadata onto staged entries at commit time, then
//!   persists them inside one store transaction.

pub mod entity;
pub mod error;
pub mod filter;
pub mod paged;
pub mod repository;
pub mod session;
mod tracker;

pub use entity::{
    ActorKey, AuditCapability, Capabilities, DeleteCapability, Entity, IdKey,
};
pub use error::{Error, Result};
pub use filter::QueryOptions;
pub use paged::Paged;
pub use repository::{ReadOnlyRepository, Repository};
pub use session::Session;

pub use stowage_db as db;

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rusqlite::types::Value;
    use stowage_db::{
        datetime_value, entity_columns, expr::Col, from_optional_json, to_json, Database,
        FromRow, OpenOptions, Predicate as _, Projection, SortDirection,
    };

    use super::*;

    const DEFAULT_ACTOR: i64 = 1;

    entity_columns!(
        employees {
            table: "employees",
            columns: {
                ID: i64 => "id",
                NAME: String => "name",
                COMPANY_ID: Option<i64> => "company_id",
                SKILLS: Option<Vec<String>> => "skills"
            }
        }
    );

    #[derive(Debug, Clone)]
    struct Employee {
        id: Option<i64>,
        name: String,
        company_id: Option<i64>,
        skills: Option<Vec<String>>,
        created_at: Option<DateTime<Utc>>,
        created_by: Option<i64>,
        modified_at: Option<DateTime<Utc>>,
        modified_by: Option<i64>,
        deleted_at: Option<DateTime<Utc>>,
        deleted_by: Option<i64>,
    }

    impl Employee {
        fn named(name: &str) -> Self {
            Self {
                id: None,
                name: name.to_string(),
                company_id: None,
                skills: None,
                created_at: None,
                created_by: None,
                modified_at: None,
                modified_by: None,
                deleted_at: None,
                deleted_by: None,
            }
        }
    }

    impl FromRow for Employee {
        fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
                company_id: row.get("company_id")?,
                skills: from_optional_json(row.get("skills")),
                created_at: row.get("created_at")?,
                created_by: row.get("created_by")?,
                modified_at: row.get("modified_at")?,
                modified_by: row.get("modified_by")?,
                deleted_at: row.get("deleted_at")?,
                deleted_by: row.get("deleted_by")?,
            })
        }
    }

    impl Entity for Employee {
        type Id = i64;
        type Actor = i64;

        const TABLE: &'static str = "employees";
        const ID_COLUMN: &'static str = "id";
        const DELETED_COLUMN: Option<&'static str> = Some("deleted_at");
        const CAPS: Capabilities =
            Capabilities::new(AuditCapability::WithActor, DeleteCapability::SoftWithActor);

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("name", Value::Text(self.name.clone())),
                ("company_id", self.company_id.into()),
                (
                    "skills",
                    match &self.skills {
                        Some(skills) => Value::Text(to_json(skills)),
                        None => Value::Null,
                    },
                ),
                ("created_at", datetime_value(self.created_at)),
                ("created_by", self.created_by.into()),
                ("modified_at", datetime_value(self.modified_at)),
                ("modified_by", self.modified_by.into()),
                ("deleted_at", datetime_value(self.deleted_at)),
                ("deleted_by", self.deleted_by.into()),
            ]
        }

        fn set_created(&mut self, at: DateTime<Utc>) {
            self.created_at = Some(at);
        }

        fn set_modified(&mut self, at: DateTime<Utc>) {
            self.modified_at = Some(at);
        }

        fn set_created_by(&mut self, by: i64) {
            self.created_by = Some(by);
        }

        fn set_modified_by(&mut self, by: i64) {
            self.modified_by = Some(by);
        }

        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            self.deleted_at
        }

        fn set_deleted(&mut self, at: Option<DateTime<Utc>>) {
            self.deleted_at = at;
        }

        fn set_deleted_by(&mut self, by: i64) {
            self.deleted_by = Some(by);
        }
    }

    #[derive(Debug, Clone)]
    struct Company {
        id: Option<i64>,
        name: String,
    }

    impl FromRow for Company {
        fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
            })
        }
    }

    impl Entity for Company {
        type Id = i64;
        type Actor = i64;

        const TABLE: &'static str = "companies";
        const ID_COLUMN: &'static str = "id";

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn row(&self) -> Vec<(&'static str, Value)> {
            vec![("name", Value::Text(self.name.clone()))]
        }
    }

    // Timestamps without actors, soft delete without a deleter column.
    #[derive(Debug, Clone)]
    struct Memo {
        id: Option<i64>,
        body: String,
        created_at: Option<DateTime<Utc>>,
        modified_at: Option<DateTime<Utc>>,
        deleted_at: Option<DateTime<Utc>>,
    }

    impl FromRow for Memo {
        fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                body: row.get("body")?,
                created_at: row.get("created_at")?,
                modified_at: row.get("modified_at")?,
                deleted_at: row.get("deleted_at")?,
            })
        }
    }

    impl Entity for Memo {
        type Id = i64;
        type Actor = i64;

        const TABLE: &'static str = "memos";
        const ID_COLUMN: &'static str = "id";
        const DELETED_COLUMN: Option<&'static str> = Some("deleted_at");
        const CAPS: Capabilities =
            Capabilities::new(AuditCapability::Timestamps, DeleteCapability::Soft);

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn row(&self) -> Vec<(&'static str, Value)> {
            vec![
                ("body", Value::Text(self.body.clone())),
                ("created_at", datetime_value(self.created_at)),
                ("modified_at", datetime_value(self.modified_at)),
                ("deleted_at", datetime_value(self.deleted_at)),
            ]
        }

        fn set_created(&mut self, at: DateTime<Utc>) {
            self.created_at = Some(at);
        }

        fn set_modified(&mut self, at: DateTime<Utc>) {
            self.modified_at = Some(at);
        }

        fn deleted_at(&self) -> Option<DateTime<Utc>> {
            self.deleted_at
        }

        fn set_deleted(&mut self, at: Option<DateTime<Utc>>) {
            self.deleted_at = at;
        }
    }

    const SCHEMA: &str = "CREATE TABLE employees (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                company_id INTEGER,
                skills JSONB,
                created_at TEXT,
                created_by INTEGER,
                modified_at TEXT,
                modified_by INTEGER,
                deleted_at TEXT,
                deleted_by INTEGER
            );
            CREATE TABLE companies (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );
            CREATE TABLE memos (
                id INTEGER PRIMARY KEY,
                body TEXT NOT NULL,
                created_at TEXT,
                modified_at TEXT,
                deleted_at TEXT
            );";

    fn setup() -> Session<i64> {
        let db = Database::open_in_memory().unwrap();
        db.execute_batch(SCHEMA).unwrap();
        Session::new(db, DEFAULT_ACTOR)
    }

    fn close_to_now(at: DateTime<Utc>) -> bool {
        (Utc::now() - at).num_seconds().abs() < 5
    }

    #[test]
    fn get_all_and_count_agree_on_a_condition() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add(Employee::named("John"));
        repo.add(Employee::named("John"));
        repo.add(Employee::named("Peter"));
        session.commit(None).unwrap();

        let johns = repo
            .get_all(
                QueryOptions::new()
                    .filter(employees::NAME.eq("John".to_string()))
                    .order_by(employees::ID, SortDirection::Asc),
            )
            .unwrap();
        assert_eq!(johns.len(), 2);
        assert!(johns.iter().all(|e| e.name == "John"));

        let count = repo
            .count(QueryOptions::new().filter(employees::NAME.eq("John".to_string())))
            .unwrap();
        assert_eq!(count, 2);

        assert_eq!(repo.count(QueryOptions::new()).unwrap(), 3);
        assert_eq!(repo.get_all(QueryOptions::new()).unwrap().len(), 3);
    }

    #[test]
    fn any_reflects_matching_rows() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add(Employee::named("John"));
        session.commit(None).unwrap();

        assert!(repo.any(employees::NAME.eq("John".to_string())).unwrap());
        assert!(!repo.any(employees::NAME.eq("Greta".to_string())).unwrap());
    }

    #[test]
    fn paged_results_partition_the_set() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add_many([
            Employee::named("Anna"),
            Employee::named("Bert"),
            Employee::named("Cleo"),
        ]);
        session.commit(None).unwrap();

        let options = || QueryOptions::new().order_by(employees::NAME, SortDirection::Asc);

        let first = repo.get_paged(1, 2, options()).unwrap();
        assert_eq!(first.results.len(), 2);
        assert_eq!(first.total_count, 3);
        assert_eq!(first.total_pages(), 2);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let second = repo.get_paged(2, 2, options()).unwrap();
        assert_eq!(second.results.len(), 1);
        assert_eq!(second.total_count, first.total_count);
        assert!(!second.has_next());
        assert!(second.has_previous());

        let mut names: Vec<_> = first
            .results
            .iter()
            .chain(second.results.iter())
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(names, vec!["Anna", "Bert", "Cleo"]);
        names.dedup();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn audit_stamps_creation_and_modification_independently() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add(Employee::named("John"));
        session.commit(Some(42)).unwrap();

        let created = repo
            .get_single(QueryOptions::new().filter(employees::NAME.eq("John".to_string())))
            .unwrap();
        assert!(close_to_now(created.created_at.unwrap()));
        assert_eq!(created.created_by, Some(42));
        assert_eq!(created.modified_at, None);
        assert_eq!(created.modified_by, None);

        let original_created_at = created.created_at;
        let mut renamed = created;
        renamed.name = "Johnny".to_string();
        repo.update(renamed);
        session.commit(Some(7)).unwrap();

        let modified = repo
            .get_single(QueryOptions::new().filter(employees::NAME.eq("Johnny".to_string())))
            .unwrap();
        assert!(close_to_now(modified.modified_at.unwrap()));
        assert_eq!(modified.modified_by, Some(7));
        assert_eq!(modified.created_at, original_created_at);
        assert_eq!(modified.created_by, Some(42));
    }

    #[test]
    fn default_actor_is_stamped_when_commit_gets_none() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add(Employee::named("John"));
        session.commit(None).unwrap();

        let created = repo.get_first(QueryOptions::new()).unwrap();
        assert_eq!(created.created_by, Some(DEFAULT_ACTOR));
    }

    #[test]
    fn soft_delete_hides_rows_until_filters_are_bypassed() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add(Employee::named("John"));
        session.commit(None).unwrap();

        let john = repo.get_first(QueryOptions::new()).unwrap();
        let id = john.id.unwrap();
        repo.delete(john);
        session.commit(Some(9)).unwrap();

        assert!(repo.get_all(QueryOptions::new()).unwrap().is_empty());
        assert_eq!(repo.count(QueryOptions::new()).unwrap(), 0);
        assert!(repo.get_by_id(id, QueryOptions::new()).unwrap().is_none());

        let hidden = repo
            .get_by_id(id, QueryOptions::new().ignore_filters())
            .unwrap()
            .expect("row must survive a soft delete");
        assert!(close_to_now(hidden.deleted_at.unwrap()));
        assert_eq!(hidden.deleted_by, Some(9));
    }

    #[test]
    fn hard_delete_removes_the_row_entirely() {
        let session = setup();
        let repo = session.repository::<Company>();

        repo.add(Company {
            id: None,
            name: "Acme".to_string(),
        });
        session.commit(None).unwrap();

        let acme = repo.get_first(QueryOptions::new()).unwrap();
        repo.delete(acme);
        session.commit(None).unwrap();

        assert!(repo.get_all(QueryOptions::new()).unwrap().is_empty());
        assert!(
            repo.get_all(QueryOptions::new().ignore_filters())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn timestamps_only_entities_are_stamped_without_actors() {
        let session = setup();
        let repo = session.repository::<Memo>();

        repo.add(Memo {
            id: None,
            body: "remember the milk".to_string(),
            created_at: None,
            modified_at: None,
            deleted_at: None,
        });
        session.commit(Some(42)).unwrap();

        let memo = repo.get_first(QueryOptions::new()).unwrap();
        assert!(close_to_now(memo.created_at.unwrap()));
        assert_eq!(memo.modified_at, None);

        let id = memo.id.unwrap();
        repo.delete(memo);
        session.commit(None).unwrap();

        assert!(repo.get_all(QueryOptions::new()).unwrap().is_empty());
        let hidden = repo
            .get_by_id(id, QueryOptions::new().ignore_filters())
            .unwrap()
            .unwrap();
        assert!(close_to_now(hidden.deleted_at.unwrap()));
    }

    #[test]
    fn single_and_first_enforce_cardinality() {
        let session = setup();
        let repo = session.repository::<Employee>();

        let none = repo.get_single(QueryOptions::new());
        assert!(matches!(none, Err(Error::NoRows)));
        let none = repo.get_first(QueryOptions::new());
        assert!(matches!(none, Err(Error::NoRows)));
        assert!(repo.get_single_opt(QueryOptions::new()).unwrap().is_none());

        repo.add(Employee::named("John"));
        session.commit(None).unwrap();
        assert_eq!(
            repo.get_single(QueryOptions::new()).unwrap().name,
            "John"
        );

        repo.add(Employee::named("John"));
        session.commit(None).unwrap();

        let many = repo
            .get_single(QueryOptions::new().filter(employees::NAME.eq("John".to_string())));
        assert!(matches!(many, Err(Error::MultipleRows)));
        let many = repo
            .get_single_opt(QueryOptions::new().filter(employees::NAME.eq("John".to_string())));
        assert!(matches!(many, Err(Error::MultipleRows)));

        // Any match satisfies get_first.
        assert!(repo.get_first(QueryOptions::new()).is_ok());
    }

    #[test]
    fn delete_by_id_is_a_noop_for_missing_rows() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.delete_by_id(9999).unwrap();
        assert_eq!(session.pending(), 0);

        repo.add(Employee::named("John"));
        session.commit(None).unwrap();

        let id = repo.get_first(QueryOptions::new()).unwrap().id.unwrap();
        repo.delete_by_id(id).unwrap();
        assert_eq!(session.pending(), 1);
        session.commit(None).unwrap();

        assert!(repo.get_all(QueryOptions::new()).unwrap().is_empty());
    }

    #[test]
    fn updates_require_an_identifier() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.update(Employee::named("ghost"));
        let err = session.commit(None);
        assert!(matches!(err, Err(Error::MissingId { table: "employees" })));

        // The failed flush keeps the entry staged.
        assert_eq!(session.pending(), 1);
    }

    #[test]
    fn range_updates_and_deletes_apply_per_entity() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add_many([Employee::named("Anna"), Employee::named("Bert")]);
        session.commit(None).unwrap();

        let mut all = repo.get_all(QueryOptions::new()).unwrap();
        for employee in &mut all {
            employee.company_id = Some(1);
        }
        repo.update_many(all);
        session.commit(None).unwrap();

        let assigned = repo
            .count(QueryOptions::new().filter(employees::COMPANY_ID.is_not_null()))
            .unwrap();
        assert_eq!(assigned, 2);

        let all = repo.get_all(QueryOptions::new()).unwrap();
        repo.delete_many(all);
        session.commit(None).unwrap();

        assert!(repo.get_all(QueryOptions::new()).unwrap().is_empty());
        assert_eq!(
            repo.count(QueryOptions::new().ignore_filters()).unwrap(),
            2
        );
    }

    #[test]
    fn ordering_is_applied_after_filtering() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add_many([
            Employee::named("Anna"),
            Employee::named("Bert"),
            Employee::named("Cleo"),
        ]);
        session.commit(None).unwrap();

        let descending = repo
            .get_all(
                QueryOptions::new()
                    .filter(employees::NAME.ne("Bert".to_string()))
                    .order_by(employees::NAME, SortDirection::Desc),
            )
            .unwrap();
        let names: Vec<_> = descending.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Cleo", "Anna"]);
    }

    #[test]
    fn joins_narrow_by_related_rows() {
        let session = setup();
        let companies = session.repository::<Company>();
        let repo = session.repository::<Employee>();

        companies.add(Company {
            id: None,
            name: "Acme".to_string(),
        });
        session.commit(None).unwrap();
        let acme_id = companies.get_first(QueryOptions::new()).unwrap().id;

        let mut john = Employee::named("John");
        john.company_id = acme_id;
        repo.add(john);
        repo.add(Employee::named("Peter"));
        session.commit(None).unwrap();

        let staff = repo
            .get_all(
                QueryOptions::new()
                    .join("JOIN companies ON employees.company_id = companies.id")
                    .filter(Col::<String>::new("companies.name").eq("Acme".to_string())),
            )
            .unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].name, "John");

        let assigned = repo
            .count(QueryOptions::new().filter(employees::COMPANY_ID.is_not_null()))
            .unwrap();
        assert_eq!(assigned, 1);
    }

    #[test]
    fn projections_materialize_column_subsets() {
        #[derive(Debug)]
        struct NameOnly {
            name: String,
            skills: Option<Vec<String>>,
        }

        impl FromRow for NameOnly {
            fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
                Ok(Self {
                    name: row.get("name")?,
                    skills: from_optional_json(row.get("skills")),
                })
            }
        }

        let session = setup();
        let repo = session.repository::<Employee>();

        let mut john = Employee::named("John");
        john.skills = Some(vec!["rust".to_string(), "sql".to_string()]);
        repo.add(john);
        session.commit(None).unwrap();

        let projection = || Projection::new().col(employees::NAME).col(employees::SKILLS);

        let all: Vec<NameOnly> = repo
            .reader()
            .get_all_as(projection(), QueryOptions::new())
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "John");
        assert_eq!(
            all[0].skills,
            Some(vec!["rust".to_string(), "sql".to_string()])
        );

        let single: Option<NameOnly> = repo
            .reader()
            .get_single_opt_as(
                projection(),
                QueryOptions::new().filter(employees::NAME.eq("John".to_string())),
            )
            .unwrap();
        assert!(single.is_some());

        let id = repo.get_first(QueryOptions::new()).unwrap().id.unwrap();
        let by_id: Option<NameOnly> = repo
            .reader()
            .get_by_id_as(id, projection(), QueryOptions::new())
            .unwrap();
        assert_eq!(by_id.unwrap().name, "John");
    }

    #[test]
    fn read_only_repositories_serve_queries_without_writes() {
        let session = setup();
        let repo = session.repository::<Employee>();
        repo.add(Employee::named("John"));
        session.commit(None).unwrap();

        let standalone = ReadOnlyRepository::<Employee>::new(session.database().clone());
        assert_eq!(standalone.count(QueryOptions::new()).unwrap(), 1);
        assert!(
            standalone
                .get_single_opt(QueryOptions::new().untracked())
                .unwrap()
                .is_some()
        );

        let scoped = session.read_only::<Employee>();
        assert!(scoped.get_first_opt(QueryOptions::new()).unwrap().is_some());
    }

    #[test]
    fn commit_without_staged_changes_is_empty() {
        let session = setup();
        assert_eq!(session.commit(None).unwrap(), 0);
    }

    #[test]
    fn file_backed_sessions_persist_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stowage.db");

        {
            let db = Database::open(&path, &OpenOptions::default()).unwrap();
            db.execute_batch(SCHEMA).unwrap();
            let session = Session::new(db, DEFAULT_ACTOR);
            let repo = session.repository::<Employee>();
            repo.add(Employee::named("John"));
            session.commit(None).unwrap();
        }

        let db = Database::open(&path, &OpenOptions::default()).unwrap();
        let reads = ReadOnlyRepository::<Employee>::new(db);
        assert_eq!(reads.count(QueryOptions::new()).unwrap(), 1);
    }

    #[tokio::test]
    async fn async_duals_share_the_sync_semantics() {
        let session = setup();
        let repo = session.repository::<Employee>();

        repo.add_async(Employee::named("John")).await;
        repo.add_many_async([Employee::named("Jane"), Employee::named("Peter")])
            .await;
        session.commit_async(Some(5)).await.unwrap();

        assert!(
            repo.any_async(employees::NAME.eq("Jane".to_string()))
                .await
                .unwrap()
        );
        assert_eq!(repo.count_async(QueryOptions::new()).await.unwrap(), 3);

        let all = repo.get_all_async(QueryOptions::new()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|e| e.created_by == Some(5)));

        let paged = repo
            .get_paged_async(
                1,
                2,
                QueryOptions::new().order_by(employees::NAME, SortDirection::Asc),
            )
            .await
            .unwrap();
        assert_eq!(paged.results.len(), 2);
        assert_eq!(paged.total_count, 3);

        let first = repo
            .get_first_opt_async(
                QueryOptions::new().filter(employees::NAME.eq("Peter".to_string())),
            )
            .await
            .unwrap();
        assert_eq!(first.map(|e| e.name), Some("Peter".to_string()));
    }
}

//! Per-entity importers and the shared row driver
//!
//! Every importer runs through `import_rows`: validate, check the natural key
//! when the importer rejects existing records, build the record, create it
//! through the entity registry, record it in the manifest, run the
//! post-create hook. Failures are collected per row and never propagate.

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use super::parser::CsvRow;
use super::validation::{
    parse_bool, parse_count, parse_date, parse_number, template, validate_against,
};
use crate::domain::result::Error;
use crate::domain::{
    normalize_email, Attendee, Checkout, Donation, ImportErrorEntry, ImportStats, ImportType,
    ImportedRecord, Member, Program, ProgramType, Record,
};
use crate::ports::{EntityRegistry, NaturalKey, ReferenceLookup};

/// Whether an importer refuses rows whose natural key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    RejectExisting,
    AllowDuplicates,
}

/// Why a single row was not imported
#[derive(Debug, Error)]
pub enum RowFailure {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    MissingReference(String),

    #[error("{0}")]
    Persistence(String),

    #[error("Attendee created but member sync failed: {0}")]
    Sync(String),
}

impl RowFailure {
    fn duplicate(key: &NaturalKey) -> Self {
        RowFailure::Duplicate(format!("{} already exists", key))
    }

    fn persistence(err: anyhow::Error) -> Self {
        // A unique index violation reads the same as a pre-check hit
        match err.downcast_ref::<Error>() {
            Some(Error::Duplicate(msg)) => RowFailure::Duplicate(msg.clone()),
            _ => RowFailure::Persistence(format!("{:#}", err)),
        }
    }
}

/// What importers can reach while building records
pub struct ImportEnv<'a> {
    pub lookup: &'a dyn ReferenceLookup,
    pub registry: &'a EntityRegistry,
    pub import_id: Uuid,
}

impl ImportEnv<'_> {
    /// Create a record and add it to the manifest
    fn create(&self, record: Record, manifest: &mut Vec<ImportedRecord>) -> anyhow::Result<Uuid> {
        let id = self.registry.create(&record)?;
        manifest.push(ImportedRecord {
            model: record.kind(),
            record_id: id,
        });
        Ok(id)
    }
}

/// A record ready to create, plus what its post-create hook needs
#[derive(Debug, Clone)]
pub struct BuiltRecord {
    pub record: Record,
    /// Program resolved while building an attendee
    pub program: Option<Program>,
}

impl From<Record> for BuiltRecord {
    fn from(record: Record) -> Self {
        Self {
            record,
            program: None,
        }
    }
}

/// Turns validated rows of one import type into records
pub trait RowImporter: Send + Sync {
    fn import_type(&self) -> ImportType;

    fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::AllowDuplicates
    }

    /// Key checked against existing records under `RejectExisting`
    fn natural_key(&self, _row: &CsvRow) -> Option<NaturalKey> {
        None
    }

    /// Resolve references and construct the record for a valid row
    fn build(&self, row: &CsvRow, env: &ImportEnv) -> Result<BuiltRecord, RowFailure>;

    /// Runs after the record is created and in the manifest
    fn after_create(
        &self,
        _built: &BuiltRecord,
        _env: &ImportEnv,
        _manifest: &mut Vec<ImportedRecord>,
    ) -> Result<(), RowFailure> {
        Ok(())
    }
}

/// Result of running the driver over a file
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub stats: ImportStats,
    pub errors: Vec<ImportErrorEntry>,
    pub imported_records: Vec<ImportedRecord>,
}

/// Import every row in order; later rows see records created by earlier ones
pub fn import_rows(importer: &dyn RowImporter, rows: &[CsvRow], env: &ImportEnv) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    outcome.stats.total_rows = rows.len() as i64;

    for row in rows {
        match import_row(importer, row, env, &mut outcome.imported_records) {
            Ok(()) => outcome.stats.successful += 1,
            Err(failure) => {
                debug!(row = row.number(), error = %failure, "Row not imported");
                outcome.stats.failed += 1;
                outcome.errors.push(ImportErrorEntry {
                    row: row.number(),
                    data: Some(row.to_json()),
                    error: failure.to_string(),
                });
            }
        }
    }

    outcome
}

fn import_row(
    importer: &dyn RowImporter,
    row: &CsvRow,
    env: &ImportEnv,
    manifest: &mut Vec<ImportedRecord>,
) -> Result<(), RowFailure> {
    let validation = validate_against(row, template(importer.import_type()));
    if !validation.valid {
        return Err(RowFailure::Validation(validation.errors));
    }

    if importer.duplicate_policy() == DuplicatePolicy::RejectExisting {
        if let Some(key) = importer.natural_key(row) {
            let exists = env
                .lookup
                .natural_key_exists(&key)
                .map_err(RowFailure::persistence)?;
            if exists {
                return Err(RowFailure::duplicate(&key));
            }
        }
    }

    let built = importer.build(row, env)?;
    env.create(built.record.clone(), manifest)
        .map_err(RowFailure::persistence)?;
    importer.after_create(&built, env, manifest)
}

/// Importer for an import type; `None` for types with a template but no importer
pub fn importer_for(import_type: ImportType) -> Option<Box<dyn RowImporter>> {
    match import_type {
        ImportType::Members => Some(Box::new(MemberImporter)),
        ImportType::Checkouts => Some(Box::new(CheckoutImporter)),
        ImportType::Donations => Some(Box::new(DonationImporter)),
        ImportType::Programs => Some(Box::new(ProgramImporter)),
        ImportType::Attendees => Some(Box::new(AttendeeImporter::new(Box::new(
            ClassroomMemberSync,
        )))),
        ImportType::Metrics => None,
    }
}

fn text(row: &CsvRow, column: &str) -> Option<String> {
    row.get(column).map(str::to_string)
}

/// Required cell of a validated row
fn required(row: &CsvRow, column: &str) -> Result<String, RowFailure> {
    text(row, column)
        .ok_or_else(|| RowFailure::Validation(vec![format!("Missing required field: {}", column)]))
}

fn date(row: &CsvRow, column: &str) -> Option<chrono::NaiveDate> {
    row.get(column).and_then(parse_date)
}

fn required_date(row: &CsvRow, column: &str) -> Result<chrono::NaiveDate, RowFailure> {
    date(row, column)
        .ok_or_else(|| RowFailure::Validation(vec![format!("Invalid date for {}", column)]))
}

fn lookup_failure(err: anyhow::Error) -> RowFailure {
    RowFailure::Persistence(format!("{:#}", err))
}

pub struct MemberImporter;

impl RowImporter for MemberImporter {
    fn import_type(&self) -> ImportType {
        ImportType::Members
    }

    fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::RejectExisting
    }

    fn natural_key(&self, row: &CsvRow) -> Option<NaturalKey> {
        row.get("email")
            .map(|email| NaturalKey::MemberEmail(normalize_email(email)))
    }

    fn build(&self, row: &CsvRow, env: &ImportEnv) -> Result<BuiltRecord, RowFailure> {
        let mut member =
            Member::new(required(row, "firstName")?, required(row, "lastName")?)
                .with_email(&required(row, "email")?);
        member.phone = text(row, "phone");
        member.address = text(row, "address");
        member.city = text(row, "city");
        member.state = text(row, "state");
        member.zip_code = text(row, "zipCode");
        member.date_of_birth = date(row, "dateOfBirth");
        member.membership_type = text(row, "membershipType");
        member.notes = text(row, "notes");
        member.import_id = Some(env.import_id);
        Ok(Record::Member(member).into())
    }
}

pub struct CheckoutImporter;

impl RowImporter for CheckoutImporter {
    fn import_type(&self) -> ImportType {
        ImportType::Checkouts
    }

    fn build(&self, row: &CsvRow, env: &ImportEnv) -> Result<BuiltRecord, RowFailure> {
        let email = normalize_email(&required(row, "memberEmail")?);
        let member = env
            .lookup
            .find_member_by_email(&email)
            .map_err(lookup_failure)?
            .ok_or_else(|| {
                RowFailure::MissingReference(format!("Member not found with email: {}", email))
            })?;

        let mut checkout = Checkout::new(
            member.id,
            required(row, "bookTitle")?,
            required_date(row, "checkoutDate")?,
        );
        checkout.author = text(row, "author");
        checkout.isbn = text(row, "isbn");
        checkout.due_date = date(row, "dueDate");
        checkout.return_date = date(row, "returnDate");
        if let Some(n) = row.get("numberOfBooks").and_then(parse_count) {
            checkout.number_of_books = n;
        }
        checkout.notes = text(row, "notes");
        checkout.import_id = Some(env.import_id);
        Ok(Record::Checkout(checkout).into())
    }
}

pub struct DonationImporter;

impl RowImporter for DonationImporter {
    fn import_type(&self) -> ImportType {
        ImportType::Donations
    }

    fn build(&self, row: &CsvRow, env: &ImportEnv) -> Result<BuiltRecord, RowFailure> {
        let mut donation = Donation::new(
            required(row, "donorName")?,
            required_date(row, "donatedAt")?,
        );

        if let Some(email) = row.get("donorEmail").map(normalize_email) {
            donation.member_id = env
                .lookup
                .find_member_by_email(&email)
                .map_err(lookup_failure)?
                .map(|m| m.id);
            donation.donor_email = Some(email);
        }
        donation.number_of_books = row.get("numberOfBooks").and_then(parse_count);
        donation.weight = row
            .get("weight")
            .and_then(parse_number)
            .and_then(Decimal::from_f64);
        donation.book_condition = text(row, "bookCondition");
        donation.notes = text(row, "notes");
        donation.import_id = Some(env.import_id);
        Ok(Record::Donation(donation).into())
    }
}

pub struct ProgramImporter;

impl RowImporter for ProgramImporter {
    fn import_type(&self) -> ImportType {
        ImportType::Programs
    }

    fn duplicate_policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::RejectExisting
    }

    fn natural_key(&self, row: &CsvRow) -> Option<NaturalKey> {
        row.get("name")
            .map(|name| NaturalKey::ProgramName(name.to_string()))
    }

    fn build(&self, row: &CsvRow, env: &ImportEnv) -> Result<BuiltRecord, RowFailure> {
        let program_type = row
            .get("programType")
            .unwrap_or_default()
            .parse()
            .unwrap_or(ProgramType::Other);

        let mut program = Program::new(required(row, "name")?, program_type);
        program.description = text(row, "description");
        program.location = text(row, "location");
        program.start_date = date(row, "startDate");
        program.end_date = date(row, "endDate");
        program.auto_sync_attendees = row
            .get("autoSyncAttendees")
            .and_then(parse_bool)
            .unwrap_or(false);
        program.import_id = Some(env.import_id);
        Ok(Record::Program(program).into())
    }
}

/// Side effect run after an attendee row is created
pub trait AttendeeHook: Send + Sync {
    fn attendee_created(
        &self,
        attendee: &Attendee,
        program: &Program,
        env: &ImportEnv,
        manifest: &mut Vec<ImportedRecord>,
    ) -> anyhow::Result<()>;
}

pub struct AttendeeImporter {
    hook: Box<dyn AttendeeHook>,
}

impl AttendeeImporter {
    pub fn new(hook: Box<dyn AttendeeHook>) -> Self {
        Self { hook }
    }

    fn program(&self, row: &CsvRow, env: &ImportEnv) -> Result<Program, RowFailure> {
        let name = required(row, "programName")?;
        env.lookup
            .find_program_by_name(&name)
            .map_err(lookup_failure)?
            .ok_or_else(|| {
                RowFailure::MissingReference(format!("Program not found with name: {}", name))
            })
    }
}

impl RowImporter for AttendeeImporter {
    fn import_type(&self) -> ImportType {
        ImportType::Attendees
    }

    fn build(&self, row: &CsvRow, env: &ImportEnv) -> Result<BuiltRecord, RowFailure> {
        let program = self.program(row, env)?;

        let mut attendee = Attendee::new(
            program.id,
            required(row, "firstName")?,
            required(row, "lastName")?,
        );
        attendee.date_of_birth = date(row, "dateOfBirth");
        attendee.parent_name = text(row, "parentName");
        attendee.parent_email = row.get("parentEmail").map(normalize_email);
        attendee.parent_phone = text(row, "parentPhone");
        attendee.notes = text(row, "notes");
        attendee.import_id = Some(env.import_id);
        Ok(BuiltRecord {
            record: Record::Attendee(attendee),
            program: Some(program),
        })
    }

    fn after_create(
        &self,
        built: &BuiltRecord,
        env: &ImportEnv,
        manifest: &mut Vec<ImportedRecord>,
    ) -> Result<(), RowFailure> {
        let (Record::Attendee(attendee), Some(program)) = (&built.record, &built.program) else {
            return Ok(());
        };
        self.hook
            .attendee_created(attendee, program, env, manifest)
            .map_err(|e| RowFailure::Sync(format!("{:#}", e)))
    }
}

/// Mirrors classroom attendees into members
///
/// For programs with `autoSyncAttendees`, finds or creates the parent member
/// (by email) and the child member (by name and date of birth), then links
/// the attendee to the child.
pub struct ClassroomMemberSync;

impl ClassroomMemberSync {
    fn parent_member(
        &self,
        attendee: &Attendee,
        env: &ImportEnv,
        manifest: &mut Vec<ImportedRecord>,
    ) -> anyhow::Result<()> {
        let Some(email) = attendee.parent_email.as_deref() else {
            return Ok(());
        };
        if env.lookup.find_member_by_email(email)?.is_some() {
            return Ok(());
        }

        let (first, last) = match attendee.parent_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => match name.split_once(' ') {
                Some((first, last)) => (first.to_string(), last.trim().to_string()),
                None => (name.to_string(), attendee.last_name.clone()),
            },
            _ => ("Parent".to_string(), attendee.last_name.clone()),
        };

        let mut parent = Member::new(first, last).with_email(email);
        parent.phone = attendee.parent_phone.clone();
        parent.import_id = attendee.import_id;
        env.create(Record::Member(parent), manifest)?;
        Ok(())
    }

    fn child_member(
        &self,
        attendee: &Attendee,
        env: &ImportEnv,
        manifest: &mut Vec<ImportedRecord>,
    ) -> anyhow::Result<Uuid> {
        if let Some(existing) = env.lookup.find_member_by_name_and_birth_date(
            &attendee.first_name,
            &attendee.last_name,
            attendee.date_of_birth,
        )? {
            return Ok(existing.id);
        }

        let mut child = Member::new(attendee.first_name.clone(), attendee.last_name.clone());
        child.date_of_birth = attendee.date_of_birth;
        child.parent_email = attendee.parent_email.clone();
        child.import_id = attendee.import_id;
        env.create(Record::Member(child), manifest)
    }
}

impl AttendeeHook for ClassroomMemberSync {
    fn attendee_created(
        &self,
        attendee: &Attendee,
        program: &Program,
        env: &ImportEnv,
        manifest: &mut Vec<ImportedRecord>,
    ) -> anyhow::Result<()> {
        if !program.syncs_attendees() {
            return Ok(());
        }

        self.parent_member(attendee, env, manifest)?;
        let child_id = self.child_member(attendee, env, manifest)?;
        env.lookup.link_attendee_member(attendee.id, child_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::adapters::duckdb::DuckDbRepository;
    use crate::adapters::stores::{default_registry, TableStore};
    use crate::domain::EntityKind;
    use crate::ports::EntityStore;
    use crate::services::import::parser::parse_csv;

    struct Fixture {
        _dir: TempDir,
        repo: Arc<DuckDbRepository>,
        registry: EntityRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let repo = Arc::new(DuckDbRepository::new(&dir.path().join("t.duckdb")).unwrap());
            repo.ensure_schema().unwrap();
            let registry = default_registry(&repo);
            Self {
                _dir: dir,
                repo,
                registry,
            }
        }

        fn run(&self, import_type: ImportType, csv: &str) -> ImportOutcome {
            let importer = importer_for(import_type).unwrap();
            let env = ImportEnv {
                lookup: self.repo.as_ref(),
                registry: &self.registry,
                import_id: Uuid::new_v4(),
            };
            import_rows(importer.as_ref(), &parse_csv(csv).unwrap().rows, &env)
        }
    }

    #[test]
    fn test_metrics_has_no_importer() {
        assert!(importer_for(ImportType::Metrics).is_none());
        assert!(importer_for(ImportType::Members).is_some());
    }

    #[test]
    fn test_validation_failure_is_collected_with_row_number() {
        let fx = Fixture::new();
        let outcome = fx.run(
            ImportType::Members,
            "firstName,lastName,email\nJohn,Doe,john@example.com\nJane,,jane@example.com\n",
        );

        assert_eq!(outcome.stats.successful, 1);
        assert_eq!(outcome.stats.failed, 1);
        assert_eq!(outcome.errors[0].row, 3);
        assert!(outcome.errors[0].error.contains("lastName"));
        assert_eq!(outcome.errors[0].data.as_ref().unwrap()["firstName"], "Jane");
        assert_eq!(outcome.imported_records.len(), 1);
    }

    #[test]
    fn test_duplicate_within_one_file() {
        let fx = Fixture::new();
        let outcome = fx.run(
            ImportType::Members,
            "firstName,lastName,email\nA,One,dup@example.org\nB,Two,DUP@example.org\n",
        );

        assert_eq!(outcome.stats.successful, 1);
        assert_eq!(
            outcome.errors[0].error,
            "Member with email dup@example.org already exists"
        );
    }

    #[test]
    fn test_checkout_requires_member() {
        let fx = Fixture::new();
        let outcome = fx.run(
            ImportType::Checkouts,
            "memberEmail,bookTitle,checkoutDate\nghost@example.org,Dune,2024-01-02\n",
        );

        assert_eq!(outcome.stats.failed, 1);
        assert_eq!(
            outcome.errors[0].error,
            "Member not found with email: ghost@example.org"
        );
    }

    #[test]
    fn test_checkout_defaults_to_one_book() {
        let fx = Fixture::new();
        fx.run(
            ImportType::Members,
            "firstName,lastName,email\nAda,Lovelace,ada@example.org\n",
        );
        let outcome = fx.run(
            ImportType::Checkouts,
            "memberEmail,bookTitle,checkoutDate\nAda@Example.org,Dune,01/02/2024\n",
        );
        assert_eq!(outcome.stats.successful, 1);

        let member = fx.repo.find_member_by_email("ada@example.org").unwrap().unwrap();
        let checkouts = fx.repo.get_checkouts_by_member(member.id).unwrap();
        assert_eq!(checkouts.len(), 1);
        assert_eq!(checkouts[0].number_of_books, 1);
    }

    #[test]
    fn test_donation_links_known_donor() {
        let fx = Fixture::new();
        fx.run(
            ImportType::Members,
            "firstName,lastName,email\nAda,Lovelace,ada@example.org\n",
        );
        let outcome = fx.run(
            ImportType::Donations,
            "donorName,donatedAt,donorEmail,weight\nAda,2024-05-01,ada@example.org,3.5\nWalk-in,2024-05-01,,\n",
        );
        assert_eq!(outcome.stats.successful, 2);

        let donations = fx.repo.get_donations().unwrap();
        let linked = donations.iter().filter(|d| d.member_id.is_some()).count();
        assert_eq!(linked, 1);
    }

    #[test]
    fn test_attendee_in_plain_program_is_not_synced() {
        let fx = Fixture::new();
        fx.run(ImportType::Programs, "name,programType\nStory Hour,event\n");
        let outcome = fx.run(
            ImportType::Attendees,
            "programName,firstName,lastName,parentEmail\nStory Hour,Milo,Reyes,ana@example.org\n",
        );

        assert_eq!(outcome.stats.successful, 1);
        assert_eq!(outcome.imported_records.len(), 1);
        assert_eq!(outcome.imported_records[0].model, EntityKind::Attendee);
        assert_eq!(fx.repo.count_entities(EntityKind::Member).unwrap(), 0);
    }

    struct FailingHook;

    impl AttendeeHook for FailingHook {
        fn attendee_created(
            &self,
            _attendee: &Attendee,
            _program: &Program,
            _env: &ImportEnv,
            _manifest: &mut Vec<ImportedRecord>,
        ) -> anyhow::Result<()> {
            anyhow::bail!("member store offline")
        }
    }

    #[test]
    fn test_hook_failure_keeps_attendee_in_manifest() {
        let fx = Fixture::new();
        fx.run(ImportType::Programs, "name,programType\nStory Hour,event\n");

        let importer = AttendeeImporter::new(Box::new(FailingHook));
        let env = ImportEnv {
            lookup: fx.repo.as_ref(),
            registry: &fx.registry,
            import_id: Uuid::new_v4(),
        };
        let rows = parse_csv("programName,firstName,lastName\nStory Hour,Milo,Reyes\n")
            .unwrap()
            .rows;
        let outcome = import_rows(&importer, &rows, &env);

        assert_eq!(outcome.stats.failed, 1);
        assert!(outcome.errors[0].error.contains("member store offline"));
        assert_eq!(outcome.imported_records.len(), 1);
    }

    /// Lookup that never reports an existing natural key, so duplicates reach the index
    struct NoPrecheck<'a>(&'a DuckDbRepository);

    impl ReferenceLookup for NoPrecheck<'_> {
        fn find_member_by_email(&self, email: &str) -> anyhow::Result<Option<Member>> {
            self.0.find_member_by_email(email)
        }

        fn find_member_by_name_and_birth_date(
            &self,
            first_name: &str,
            last_name: &str,
            date_of_birth: Option<chrono::NaiveDate>,
        ) -> anyhow::Result<Option<Member>> {
            self.0
                .find_member_by_name_and_birth_date(first_name, last_name, date_of_birth)
        }

        fn find_program_by_name(&self, name: &str) -> anyhow::Result<Option<Program>> {
            self.0.find_program_by_name(name)
        }

        fn link_attendee_member(&self, attendee_id: Uuid, member_id: Uuid) -> anyhow::Result<()> {
            self.0.link_attendee_member(attendee_id, member_id)
        }

        fn natural_key_exists(&self, _key: &NaturalKey) -> anyhow::Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_unique_index_violation_reads_as_duplicate() {
        let fx = Fixture::new();
        let lookup = NoPrecheck(fx.repo.as_ref());
        let env = ImportEnv {
            lookup: &lookup,
            registry: &fx.registry,
            import_id: Uuid::new_v4(),
        };
        let rows = parse_csv(
            "firstName,lastName,email\nA,One,dup@example.org\nB,Two,DUP@example.org\nC,Three,c@example.org\n",
        )
        .unwrap()
        .rows;
        let outcome = import_rows(&MemberImporter, &rows, &env);

        assert_eq!(outcome.stats.successful, 2);
        assert_eq!(outcome.stats.failed, 1);
        assert_eq!(outcome.errors[0].row, 3);
        assert_eq!(
            outcome.errors[0].error,
            "Member with email dup@example.org already exists"
        );
        assert_eq!(outcome.imported_records.len(), 2);
        assert_eq!(fx.repo.count_entities(EntityKind::Member).unwrap(), 2);
    }

    /// Member store that refuses one specific first name
    struct RefusingStore(TableStore);

    impl EntityStore for RefusingStore {
        fn kind(&self) -> EntityKind {
            EntityKind::Member
        }

        fn create(&self, record: &Record) -> anyhow::Result<Uuid> {
            if let Record::Member(member) = record {
                if member.first_name == "Broken" {
                    anyhow::bail!("disk quota exceeded");
                }
            }
            self.0.create(record)
        }

        fn delete_by_id(&self, id: Uuid) -> anyhow::Result<bool> {
            self.0.delete_by_id(id)
        }

        fn count(&self) -> anyhow::Result<i64> {
            self.0.count()
        }
    }

    #[test]
    fn test_store_error_fails_only_its_row() {
        let fx = Fixture::new();
        let mut registry = default_registry(&fx.repo);
        registry.register(Arc::new(RefusingStore(TableStore::new(
            Arc::clone(&fx.repo),
            EntityKind::Member,
        ))));
        let env = ImportEnv {
            lookup: fx.repo.as_ref(),
            registry: &registry,
            import_id: Uuid::new_v4(),
        };
        let rows = parse_csv(
            "firstName,lastName,email\nAda,Lovelace,ada@example.org\nBroken,Row,broken@example.org\nGrace,Hopper,grace@example.org\n",
        )
        .unwrap()
        .rows;
        let outcome = import_rows(&MemberImporter, &rows, &env);

        assert_eq!(outcome.stats.successful, 2);
        assert_eq!(outcome.stats.failed, 1);
        assert_eq!(outcome.errors[0].row, 3);
        assert_eq!(outcome.errors[0].error, "disk quota exceeded");
        assert_eq!(fx.repo.count_entities(EntityKind::Member).unwrap(), 2);
    }

    /// Lookup whose every read fails
    struct OfflineLookup;

    impl ReferenceLookup for OfflineLookup {
        fn find_member_by_email(&self, _email: &str) -> anyhow::Result<Option<Member>> {
            anyhow::bail!("connection reset")
        }

        fn find_member_by_name_and_birth_date(
            &self,
            _first_name: &str,
            _last_name: &str,
            _date_of_birth: Option<chrono::NaiveDate>,
        ) -> anyhow::Result<Option<Member>> {
            anyhow::bail!("connection reset")
        }

        fn find_program_by_name(&self, _name: &str) -> anyhow::Result<Option<Program>> {
            anyhow::bail!("connection reset")
        }

        fn link_attendee_member(&self, _attendee_id: Uuid, _member_id: Uuid) -> anyhow::Result<()> {
            anyhow::bail!("connection reset")
        }
    }

    #[test]
    fn test_lookup_error_is_not_a_missing_reference() {
        let fx = Fixture::new();
        let env = ImportEnv {
            lookup: &OfflineLookup,
            registry: &fx.registry,
            import_id: Uuid::new_v4(),
        };
        let rows = parse_csv("memberEmail,bookTitle,checkoutDate\nada@example.org,Dune,2024-01-02\n")
            .unwrap()
            .rows;
        let outcome = import_rows(&CheckoutImporter, &rows, &env);

        assert_eq!(outcome.stats.failed, 1);
        assert_eq!(outcome.errors[0].error, "connection reset");
    }

    #[test]
    fn test_book_count_must_be_whole() {
        let fx = Fixture::new();
        fx.run(
            ImportType::Members,
            "firstName,lastName,email\nAda,Lovelace,ada@example.org\n",
        );
        let outcome = fx.run(
            ImportType::Checkouts,
            "memberEmail,bookTitle,checkoutDate,numberOfBooks\nada@example.org,Dune,2024-01-02,2.7\nada@example.org,Emma,2024-01-02,3\n",
        );

        assert_eq!(outcome.stats.successful, 1);
        assert_eq!(outcome.errors[0].error, "Invalid count for numberOfBooks: 2.7");

        let member = fx.repo.find_member_by_email("ada@example.org").unwrap().unwrap();
        let checkouts = fx.repo.get_checkouts_by_member(member.id).unwrap();
        assert_eq!(checkouts[0].number_of_books, 3);
    }

    /// Counts program lookups, delegating everything to the repository
    struct CountingLookup<'a> {
        repo: &'a DuckDbRepository,
        program_lookups: std::sync::atomic::AtomicUsize,
    }

    impl ReferenceLookup for CountingLookup<'_> {
        fn find_member_by_email(&self, email: &str) -> anyhow::Result<Option<Member>> {
            self.repo.find_member_by_email(email)
        }

        fn find_member_by_name_and_birth_date(
            &self,
            first_name: &str,
            last_name: &str,
            date_of_birth: Option<chrono::NaiveDate>,
        ) -> anyhow::Result<Option<Member>> {
            self.repo
                .find_member_by_name_and_birth_date(first_name, last_name, date_of_birth)
        }

        fn find_program_by_name(&self, name: &str) -> anyhow::Result<Option<Program>> {
            self.program_lookups
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.repo.find_program_by_name(name)
        }

        fn link_attendee_member(&self, attendee_id: Uuid, member_id: Uuid) -> anyhow::Result<()> {
            self.repo.link_attendee_member(attendee_id, member_id)
        }
    }

    #[test]
    fn test_attendee_program_is_resolved_once_per_row() {
        let fx = Fixture::new();
        fx.run(
            ImportType::Programs,
            "name,programType,autoSyncAttendees\nReading Buddies,classroom,yes\n",
        );

        let lookup = CountingLookup {
            repo: fx.repo.as_ref(),
            program_lookups: std::sync::atomic::AtomicUsize::new(0),
        };
        let env = ImportEnv {
            lookup: &lookup,
            registry: &fx.registry,
            import_id: Uuid::new_v4(),
        };
        let rows = parse_csv(
            "programName,firstName,lastName\nReading Buddies,Milo,Reyes\nReading Buddies,Luz,Reyes\n",
        )
        .unwrap()
        .rows;
        let importer = AttendeeImporter::new(Box::new(ClassroomMemberSync));
        let outcome = import_rows(&importer, &rows, &env);

        assert_eq!(outcome.stats.successful, 2);
        // The hook still saw a classroom program: both children were synced
        assert_eq!(fx.repo.count_entities(EntityKind::Member).unwrap(), 2);
        assert_eq!(
            lookup
                .program_lookups
                .load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }
}

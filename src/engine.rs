//! Statement execution.
//!
//! The [`Executor`] walks a parsed [`Document`] group by group and statement
//! by statement, resolving targets through a [`Repository`] and committing
//! after every instance. Failures are recorded per statement and never stop
//! the run.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::document::{Action, Document, DocumentError, ParseOptions, Statement, StatementGroup};
use crate::entity::Entity;
use crate::repository::{PersistenceError, Predicate, Repository};
use crate::schema::{AttributeError, TypeNamespace};

/// What to do when an update or delete key predicate matches several rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanOutPolicy {
    /// Apply the statement to every match
    #[default]
    ApplyAll,
    /// Fail the statement with [`ResolutionError::Ambiguous`]
    Reject,
}

impl FromStr for FanOutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "apply_all" | "all" => Ok(FanOutPolicy::ApplyAll),
            "reject" => Ok(FanOutPolicy::Reject),
            other => Err(format!("Unknown fan-out policy '{}' (expected apply_all or reject)", other)),
        }
    }
}

impl fmt::Display for FanOutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanOutPolicy::ApplyAll => write!(f, "apply_all"),
            FanOutPolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    pub fan_out: FanOutPolicy,
}

/// An update or delete that could not be pointed at stored rows.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionError {
    NoMatch,
    Ambiguous { matches: usize },
    NoKeyColumns,
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::NoMatch => write!(f, "No stored entity matches the key columns"),
            ResolutionError::Ambiguous { matches } => {
                write!(f, "Key columns match {} entities", matches)
            }
            ResolutionError::NoKeyColumns => {
                write!(f, "Group declares no key columns and no primary key")
            }
        }
    }
}

impl std::error::Error for ResolutionError {}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementError {
    Resolution(ResolutionError),
    Attribute(AttributeError),
    Persistence(PersistenceError),
}

impl fmt::Display for StatementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementError::Resolution(e) => write!(f, "Resolution error: {}", e),
            StatementError::Attribute(e) => write!(f, "Attribute error: {}", e),
            StatementError::Persistence(e) => write!(f, "Persistence error: {}", e),
        }
    }
}

impl std::error::Error for StatementError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatementError::Resolution(e) => Some(e),
            StatementError::Attribute(e) => Some(e),
            StatementError::Persistence(e) => Some(e),
        }
    }
}

impl From<ResolutionError> for StatementError {
    fn from(err: ResolutionError) -> Self {
        StatementError::Resolution(err)
    }
}

impl From<AttributeError> for StatementError {
    fn from(err: AttributeError) -> Self {
        StatementError::Attribute(err)
    }
}

impl From<PersistenceError> for StatementError {
    fn from(err: PersistenceError) -> Self {
        StatementError::Persistence(err)
    }
}

/// Result of one statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementOutcome {
    pub line_number: usize,
    pub content: String,
    pub action: Action,
    /// Instances committed for this statement
    pub applied: usize,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<StatementError>,
}

impl StatementOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

fn serialize_error<S: Serializer>(error: &Option<StatementError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_some(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Instances processed across all actions
    pub total: usize,
    pub outcomes: Vec<StatementOutcome>,
}

impl ExecutionReport {
    /// `(inserted, updated, deleted, total)`
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (self.inserted, self.updated, self.deleted, self.total)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StatementOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ExecutionReport) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.total += other.total;
        self.outcomes.extend(other.outcomes);
    }

    fn record(&mut self, action: Action, applied: usize) {
        match action {
            Action::Insert => self.inserted += applied,
            Action::Update => self.updated += applied,
            Action::Delete => self.deleted += applied,
        }
        self.total += applied;
    }
}

/// Runs documents against a repository.
pub struct Executor<'r, R: Repository + ?Sized> {
    repository: &'r mut R,
    options: ExecuteOptions,
}

impl<'r, R: Repository + ?Sized> Executor<'r, R> {
    pub fn new(repository: &'r mut R) -> Self {
        Self::with_options(repository, ExecuteOptions::default())
    }

    pub fn with_options(repository: &'r mut R, options: ExecuteOptions) -> Self {
        Self { repository, options }
    }

    /// Parse `text` and execute it.
    pub fn run(
        &mut self,
        text: &str,
        namespace: &dyn TypeNamespace,
        parse_options: &ParseOptions,
    ) -> Result<ExecutionReport, DocumentError> {
        let document = Document::parse(text, namespace, parse_options)?;
        Ok(self.execute(&document))
    }

    pub fn execute(&mut self, document: &Document) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for group in document.groups() {
            tracing::info!(
                "Executing {} statements for {}",
                group.statements().len(),
                group.entity_type().qualified_name()
            );

            for statement in group.statements() {
                let location = statement.location();
                tracing::debug!("{} {}", statement.action(), location);

                let (applied, error) = match self.execute_statement(group, statement) {
                    Ok(applied) => (applied, None),
                    Err((applied, error)) => {
                        tracing::warn!("{} failed at {}: {}", statement.action(), location, error);
                        (applied, Some(error))
                    }
                };

                report.record(statement.action(), applied);
                report.outcomes.push(StatementOutcome {
                    line_number: location.line_number,
                    content: location.content.clone(),
                    action: statement.action(),
                    applied,
                    error,
                });
            }
        }

        let (inserted, updated, deleted, total) = report.counts();
        tracing::info!(
            "Inserted {}, updated {}, deleted {} ({} total)",
            inserted,
            updated,
            deleted,
            total
        );
        report
    }

    /// Number of committed instances, or the error together with however
    /// many instances were committed before it.
    fn execute_statement(
        &mut self,
        group: &StatementGroup,
        statement: &Statement,
    ) -> Result<usize, (usize, StatementError)> {
        match statement.action() {
            Action::Insert => self.insert(group, statement).map(|_| 1).map_err(|e| (0, e)),
            Action::Update | Action::Delete => {
                let targets = self.resolve(group, statement).map_err(|e| (0, e))?;
                let mut applied = 0;
                for target in targets {
                    let result = match statement.action() {
                        Action::Update => self.update(group, statement, target),
                        _ => self.delete(group, target),
                    };
                    result.map_err(|e| (applied, e))?;
                    applied += 1;
                }
                Ok(applied)
            }
        }
    }

    fn insert(&mut self, group: &StatementGroup, statement: &Statement) -> Result<(), StatementError> {
        let entity_type = group.entity_type();
        let mut entity = Entity::new(entity_type.qualified_name());

        for (position, attribute) in group.key_columns().iter().chain(group.attribute_columns()) {
            entity_type.set_attribute(&mut entity, attribute, statement.value(*position))?;
        }

        self.repository.add(entity_type, entity)?;
        self.commit()
    }

    fn update(
        &mut self,
        group: &StatementGroup,
        statement: &Statement,
        mut entity: Entity,
    ) -> Result<(), StatementError> {
        let entity_type = group.entity_type();
        for (position, attribute) in group.attribute_columns() {
            entity_type.set_attribute(&mut entity, attribute, statement.value(*position))?;
        }

        self.repository.add(entity_type, entity)?;
        self.commit()
    }

    fn delete(&mut self, group: &StatementGroup, entity: Entity) -> Result<(), StatementError> {
        self.repository.remove(group.entity_type(), &entity)?;
        self.commit()
    }

    fn commit(&mut self) -> Result<(), StatementError> {
        if let Err(err) = self.repository.commit() {
            self.repository.rollback();
            return Err(err.into());
        }
        Ok(())
    }

    /// Find the stored instances an update or delete applies to.
    fn resolve(&self, group: &StatementGroup, statement: &Statement) -> Result<Vec<Entity>, StatementError> {
        let entity_type = group.entity_type();

        if group.has_primary_key() {
            let (position, attribute) = group
                .primary_key_column()
                .ok_or(ResolutionError::NoKeyColumns)?;
            let key = entity_type
                .coerce_attribute(attribute, statement.value(position))?
                .ok_or(ResolutionError::NoMatch)?;
            return match self.repository.get_by_key(entity_type, &key)? {
                Some(entity) => Ok(vec![entity]),
                None => Err(ResolutionError::NoMatch.into()),
            };
        }

        if group.key_columns().is_empty() {
            return Err(ResolutionError::NoKeyColumns.into());
        }

        let mut predicate = Predicate::new();
        for (position, attribute) in group.key_columns() {
            let value = entity_type.coerce_attribute(attribute, statement.value(*position))?;
            predicate.push(attribute.clone(), value);
        }

        let matches = self.repository.find(entity_type, &predicate)?;
        match matches.len() {
            0 => Err(ResolutionError::NoMatch.into()),
            1 => Ok(matches),
            n if self.options.fan_out == FanOutPolicy::Reject => {
                Err(ResolutionError::Ambiguous { matches: n }.into())
            }
            _ => Ok(matches),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use crate::schema::SchemaRegistry;
    use crate::value::Value;

    const SCHEMA: &str = r#"
namespace: budget
entities:
  - name: Category
    fields:
      - name: name
        primary_key: true
      - name: parent_name
      - name: parent
        references:
          entity: Category
          via: parent_name
  - name: Tag
    fields:
      - name: label
      - name: color
"#;

    fn setup() -> (SchemaRegistry, ParseOptions) {
        (
            SchemaRegistry::from_yaml_str(SCHEMA).unwrap(),
            ParseOptions::default().with_namespace("budget"),
        )
    }

    #[test]
    fn test_insert_then_update_by_primary_key() {
        let (registry, options) = setup();
        let mut repo = MemoryRepository::new();
        let mut executor = Executor::new(&mut repo);

        let report = executor
            .run("Category,Name,Parent\n+,Expenses,\n+,Internet,Expenses\n", &registry, &options)
            .unwrap();
        assert_eq!(report.counts(), (2, 0, 0, 2));

        let report = executor
            .run("Category,Name,Parent\n~,Internet,\n", &registry, &options)
            .unwrap();
        assert_eq!(report.counts(), (0, 1, 0, 1));

        let ty = registry.get("budget", "Category").unwrap();
        let internet = repo.get_by_key(&ty, &Value::text("Internet")).unwrap().unwrap();
        assert_eq!(internet.field("parent_name"), None);
    }

    #[test]
    fn test_delete_without_match_is_reported() {
        let (registry, options) = setup();
        let mut repo = MemoryRepository::new();
        let report = Executor::new(&mut repo)
            .run("Category,{Name}\n+,Expenses\n-,Nothing\n-,Expenses\n", &registry, &options)
            .unwrap();

        assert_eq!(report.counts(), (1, 0, 1, 2));
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].line_number, 3);
        assert_eq!(failures[0].content, "-,Nothing");
        assert_eq!(
            failures[0].error,
            Some(StatementError::Resolution(ResolutionError::NoMatch))
        );
    }

    #[test]
    fn test_fan_out_policies() {
        let (registry, options) = setup();
        let seed = "Tag,label,color\n+,a,red\n+,b,red\n+,c,blue\n";
        let recolor = "Tag,label,{color}\n~,x,red\n";

        let mut repo = MemoryRepository::new();
        let mut executor = Executor::new(&mut repo);
        executor.run(seed, &registry, &options).unwrap();
        let report = executor.run(recolor, &registry, &options).unwrap();
        assert_eq!(report.counts(), (0, 2, 0, 2));

        let mut repo = MemoryRepository::new();
        let mut executor = Executor::with_options(&mut repo, ExecuteOptions { fan_out: FanOutPolicy::Reject });
        executor.run(seed, &registry, &options).unwrap();
        let report = executor.run(recolor, &registry, &options).unwrap();
        assert_eq!(report.counts(), (0, 0, 0, 0));
        assert_eq!(
            report.outcomes[0].error,
            Some(StatementError::Resolution(ResolutionError::Ambiguous { matches: 2 }))
        );
    }

    #[test]
    fn test_no_key_columns() {
        let (registry, options) = setup();
        let mut repo = MemoryRepository::new();
        let report = Executor::new(&mut repo)
            .run("Tag,label\n+,a\n-,a\n", &registry, &options)
            .unwrap();
        assert_eq!(report.counts(), (1, 0, 0, 1));
        assert_eq!(
            report.outcomes[1].error,
            Some(StatementError::Resolution(ResolutionError::NoKeyColumns))
        );
    }

    #[test]
    fn test_persistence_error_is_per_statement() {
        let (registry, options) = setup();
        let mut repo = MemoryRepository::new();
        let report = Executor::new(&mut repo)
            .run("Category,Name\n+,Expenses\n+,Expenses\n+,Income\n", &registry, &options)
            .unwrap();

        assert_eq!(report.counts(), (2, 0, 0, 2));
        assert!(matches!(
            report.outcomes[1].error,
            Some(StatementError::Persistence(PersistenceError::DuplicateKey { .. }))
        ));
        assert_eq!(repo.count("budget.Category"), 2);
        assert_eq!(repo.staged_len(), 0);
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let (registry, options) = setup();
        let mut repo = MemoryRepository::new();
        let result = Executor::new(&mut repo).run("+,Expenses\n", &registry, &options);
        assert!(matches!(result, Err(DocumentError::Structure { .. })));
    }

    #[test]
    fn test_outcome_serializes_error_as_text() {
        let outcome = StatementOutcome {
            line_number: 4,
            content: "-,x".to_string(),
            action: Action::Delete,
            applied: 0,
            error: Some(StatementError::Resolution(ResolutionError::NoMatch)),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["action"], "delete");
        assert_eq!(json["error"], "Resolution error: No stored entity matches the key columns");
    }

    #[test]
    fn test_fan_out_policy_from_str() {
        assert_eq!("reject".parse::<FanOutPolicy>().unwrap(), FanOutPolicy::Reject);
        assert_eq!("apply-all".parse::<FanOutPolicy>().unwrap(), FanOutPolicy::ApplyAll);
        assert!("sometimes".parse::<FanOutPolicy>().is_err());
    }
}

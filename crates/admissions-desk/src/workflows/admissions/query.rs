//! Parameterized SQL assembly.
//!
//! Clause text only ever contains column names from this module and numbered `?N`
//! placeholders. Every caller-supplied value travels in [`Statement::params`], with the
//! placeholder number equal to its 1-based position in that list.

use super::domain::{EnquiryFilter, EnquiryId, EnquiryUpdate, FieldChange, NewEnquiry, NewFollowUp};

pub(crate) const ENQUIRY_COLUMNS: &str =
    "id, student_name, class_applied, guardian_name, phone, source, stage, notes, created_at";

pub(crate) const FOLLOW_UP_COLUMNS: &str = "id, enquiry_id, due_on, outcome, note, created_at";

const SEARCH_COLUMNS: [&str; 3] = ["student_name_folded", "guardian_name_folded", "phone"];

/// Value bound to a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Null,
}

impl SqlValue {
    fn optional_text(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |text| Self::Text(text.to_string()))
    }
}

/// SQL text together with its ordered parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Accumulates placeholders so numbering always matches parameter order.
#[derive(Debug, Default)]
struct Params {
    values: Vec<SqlValue>,
}

impl Params {
    fn push(&mut self, value: SqlValue) -> String {
        self.values.push(value);
        format!("?{}", self.values.len())
    }

    fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// Conjunctive WHERE clause.
#[derive(Debug, Default)]
struct Predicates {
    clauses: Vec<String>,
    params: Params,
}

impl Predicates {
    fn eq(&mut self, column: &'static str, value: SqlValue) {
        let placeholder = self.params.push(value);
        self.clauses.push(format!("{column} = {placeholder}"));
    }

    /// Containment across several columns, ORed together.
    ///
    /// The columns must already hold [`fold_case`] text; the term is folded the same way.
    fn contains_any(&mut self, columns: &[&'static str], term: &str) {
        let pattern = format!("%{}%", escape_like(&fold_case(term)));
        let alternatives: Vec<String> = columns
            .iter()
            .map(|column| {
                let placeholder = self.params.push(SqlValue::Text(pattern.clone()));
                format!("{column} LIKE {placeholder} ESCAPE '\\'")
            })
            .collect();
        self.clauses.push(format!("({})", alternatives.join(" OR ")));
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Unicode lowercase used for search columns and search terms.
///
/// SQLite's `lower()` and `LIKE` only fold ASCII, so folding happens here instead.
pub(crate) fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Escape `LIKE` metacharacters so the search term matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn filter_predicates(filter: &EnquiryFilter) -> Predicates {
    let mut predicates = Predicates::default();
    if let Some(stage) = &filter.stage {
        predicates.eq("stage", SqlValue::Text(stage.clone()));
    }
    if let Some(class_applied) = &filter.class_applied {
        predicates.eq("class_applied", SqlValue::Text(class_applied.clone()));
    }
    if let Some(term) = &filter.search {
        predicates.contains_any(&SEARCH_COLUMNS, term);
    }
    predicates
}

/// `SELECT COUNT(*)` over every row the filter matches, ignoring pagination.
pub fn count_enquiries(filter: &EnquiryFilter) -> Statement {
    let predicates = filter_predicates(filter);
    Statement {
        sql: format!("SELECT COUNT(*) FROM enquiries{}", predicates.where_sql()),
        params: predicates.params.into_values(),
    }
}

/// One page of matching enquiries, newest first.
pub fn list_enquiries(filter: &EnquiryFilter) -> Statement {
    let mut predicates = filter_predicates(filter);
    let where_sql = predicates.where_sql();
    let limit = predicates.params.push(SqlValue::Integer(filter.limit));
    let offset = predicates.params.push(SqlValue::Integer(filter.offset));
    Statement {
        sql: format!(
            "SELECT {ENQUIRY_COLUMNS} FROM enquiries{where_sql} \
             ORDER BY created_at DESC, id DESC LIMIT {limit} OFFSET {offset}"
        ),
        params: predicates.params.into_values(),
    }
}

pub fn insert_enquiry(enquiry: &NewEnquiry) -> Statement {
    Statement {
        sql: "INSERT INTO enquiries \
              (student_name, class_applied, guardian_name, phone, source, notes, \
               student_name_folded, guardian_name_folded) \
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING id"
            .to_string(),
        params: vec![
            SqlValue::Text(enquiry.student_name.clone()),
            SqlValue::Text(enquiry.class_applied.clone()),
            SqlValue::Text(enquiry.guardian_name.clone()),
            SqlValue::Text(enquiry.phone.clone()),
            SqlValue::optional_text(enquiry.source.as_deref()),
            SqlValue::optional_text(enquiry.notes.as_deref()),
            SqlValue::Text(fold_case(&enquiry.student_name)),
            SqlValue::Text(fold_case(&enquiry.guardian_name)),
        ],
    }
}

pub fn select_enquiry(id: EnquiryId) -> Statement {
    Statement {
        sql: format!("SELECT {ENQUIRY_COLUMNS} FROM enquiries WHERE id = ?1"),
        params: vec![SqlValue::Integer(id.0)],
    }
}

pub fn enquiry_exists(id: EnquiryId) -> Statement {
    Statement {
        sql: "SELECT id FROM enquiries WHERE id = ?1".to_string(),
        params: vec![SqlValue::Integer(id.0)],
    }
}

/// One assignment per supplied field, identity predicate bound last.
pub fn update_enquiry(id: EnquiryId, update: &EnquiryUpdate) -> Statement {
    let mut params = Params::default();
    let assignments: Vec<String> = update
        .changes()
        .iter()
        .map(|change| {
            let value = match change {
                FieldChange::Stage(stage) => SqlValue::Text(stage.as_str().to_string()),
                FieldChange::ClassApplied(class_applied) => SqlValue::Text(class_applied.clone()),
                FieldChange::Notes(text) | FieldChange::Source(text) => {
                    SqlValue::optional_text(text.as_deref())
                }
            };
            format!("{} = {}", change.column(), params.push(value))
        })
        .collect();
    let identity = params.push(SqlValue::Integer(id.0));

    Statement {
        sql: format!(
            "UPDATE enquiries SET {} WHERE id = {identity} RETURNING {ENQUIRY_COLUMNS}",
            assignments.join(", ")
        ),
        params: params.into_values(),
    }
}

/// Insert that only produces a row when the parent enquiry exists.
pub fn insert_follow_up(enquiry_id: EnquiryId, follow_up: &NewFollowUp) -> Statement {
    Statement {
        sql: "INSERT INTO followups (enquiry_id, due_on, outcome, note) \
              SELECT ?1, ?2, ?3, ?4 \
              WHERE EXISTS (SELECT 1 FROM enquiries WHERE id = ?5) \
              RETURNING id"
            .to_string(),
        params: vec![
            SqlValue::Integer(enquiry_id.0),
            SqlValue::Text(follow_up.due_on.format("%Y-%m-%d").to_string()),
            SqlValue::optional_text(follow_up.outcome.as_deref()),
            SqlValue::optional_text(follow_up.note.as_deref()),
            SqlValue::Integer(enquiry_id.0),
        ],
    }
}

pub fn list_follow_ups(enquiry_id: EnquiryId) -> Statement {
    Statement {
        sql: format!(
            "SELECT {FOLLOW_UP_COLUMNS} FROM followups WHERE enquiry_id = ?1 \
             ORDER BY due_on ASC, created_at DESC, id DESC"
        ),
        params: vec![SqlValue::Integer(enquiry_id.0)],
    }
}

/// `stage, COUNT(*)` grouped by stage, optionally scoped to one class.
pub fn stage_counts(class_applied: Option<&str>) -> Statement {
    let mut predicates = Predicates::default();
    if let Some(class_applied) = class_applied {
        predicates.eq("class_applied", SqlValue::Text(class_applied.to_string()));
    }
    Statement {
        sql: format!(
            "SELECT stage, COUNT(*) AS count FROM enquiries{} GROUP BY stage",
            predicates.where_sql()
        ),
        params: predicates.params.into_values(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::admissions::domain::Stage;

    fn filter() -> EnquiryFilter {
        EnquiryFilter {
            stage: None,
            class_applied: None,
            search: None,
            limit: 20,
            offset: 0,
        }
    }

    fn placeholder_count(sql: &str) -> usize {
        sql.matches('?').count()
    }

    #[test]
    fn unfiltered_listing_binds_only_pagination() {
        let statement = list_enquiries(&filter());
        assert!(!statement.sql.contains("WHERE"));
        assert!(statement.sql.ends_with("LIMIT ?1 OFFSET ?2"));
        assert_eq!(
            statement.params,
            vec![SqlValue::Integer(20), SqlValue::Integer(0)]
        );
    }

    #[test]
    fn filters_number_placeholders_in_construction_order() {
        let statement = list_enquiries(&EnquiryFilter {
            stage: Some("new".to_string()),
            class_applied: Some("Grade 2".to_string()),
            search: Some("rao".to_string()),
            limit: 10,
            offset: 30,
        });

        assert!(statement.sql.contains("stage = ?1 AND class_applied = ?2 AND ("));
        assert!(statement.sql.contains("student_name_folded LIKE ?3"));
        assert!(statement.sql.contains("guardian_name_folded LIKE ?4"));
        assert!(statement.sql.contains("phone LIKE ?5"));
        assert!(statement.sql.contains("LIMIT ?6 OFFSET ?7"));
        assert_eq!(placeholder_count(&statement.sql), statement.params.len());
        assert_eq!(statement.params[2], SqlValue::Text("%rao%".to_string()));
        assert_eq!(statement.params[6], SqlValue::Integer(30));
    }

    #[test]
    fn count_shares_predicates_without_pagination() {
        let statement = count_enquiries(&EnquiryFilter {
            class_applied: Some("Grade 2".to_string()),
            ..filter()
        });
        assert_eq!(
            statement.sql,
            "SELECT COUNT(*) FROM enquiries WHERE class_applied = ?1"
        );
        assert_eq!(statement.params, vec![SqlValue::Text("Grade 2".to_string())]);
    }

    #[test]
    fn user_text_never_reaches_sql() {
        let hostile = "x'; DROP TABLE enquiries; --";
        let statement = list_enquiries(&EnquiryFilter {
            stage: Some(hostile.to_string()),
            search: Some(hostile.to_string()),
            ..filter()
        });
        assert!(!statement.sql.contains("DROP TABLE"));
        assert_eq!(statement.params[0], SqlValue::Text(hostile.to_string()));
    }

    #[test]
    fn search_term_is_folded_beyond_ascii() {
        let statement = count_enquiries(&EnquiryFilter {
            search: Some("ÉLODIE".to_string()),
            ..filter()
        });
        assert_eq!(statement.params[0], SqlValue::Text("%élodie%".to_string()));
    }

    #[test]
    fn insert_stores_folded_names() {
        let statement = insert_enquiry(&NewEnquiry {
            student_name: "Zoë Ångström".to_string(),
            class_applied: "Grade 1".to_string(),
            guardian_name: "ÉLODIE Ångström".to_string(),
            phone: "5551234".to_string(),
            source: None,
            notes: None,
        });
        assert_eq!(placeholder_count(&statement.sql), statement.params.len());
        assert_eq!(statement.params[6], SqlValue::Text("zoë ångström".to_string()));
        assert_eq!(statement.params[7], SqlValue::Text("élodie ångström".to_string()));
    }

    #[test]
    fn search_term_escapes_like_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn update_assigns_present_fields_then_identity() {
        let update = EnquiryUpdate::new(vec![
            FieldChange::Stage(Stage::Scheduled),
            FieldChange::Notes(None),
            FieldChange::Source(Some("fair".to_string())),
        ])
        .expect("non-empty");
        let statement = update_enquiry(EnquiryId(9), &update);

        assert!(statement
            .sql
            .starts_with("UPDATE enquiries SET stage = ?1, notes = ?2, source = ?3 WHERE id = ?4"));
        assert_eq!(
            statement.params,
            vec![
                SqlValue::Text("scheduled".to_string()),
                SqlValue::Null,
                SqlValue::Text("fair".to_string()),
                SqlValue::Integer(9),
            ]
        );
    }

    #[test]
    fn single_field_update_has_two_params() {
        let update = EnquiryUpdate::new(vec![FieldChange::ClassApplied("Grade 5".to_string())])
            .expect("non-empty");
        let statement = update_enquiry(EnquiryId(3), &update);
        assert!(statement.sql.contains("SET class_applied = ?1 WHERE id = ?2"));
        assert_eq!(statement.params.len(), 2);
    }

    #[test]
    fn stage_counts_scope_by_class() {
        let all = stage_counts(None);
        assert!(all.params.is_empty());
        assert!(all.sql.ends_with("FROM enquiries GROUP BY stage"));

        let scoped = stage_counts(Some("Grade 1"));
        assert!(scoped
            .sql
            .ends_with("FROM enquiries WHERE class_applied = ?1 GROUP BY stage"));
        assert_eq!(scoped.params, vec![SqlValue::Text("Grade 1".to_string())]);
    }
}

use uuid::Uuid;

use super::types::{FilterValue, SortDirection, SqlResult};
use crate::database::models::{Class, PromotionStatus};

/// Conjunctive predicate over classes. The same value drives the Postgres
/// WHERE clause and the in-memory store, so both backends select identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassFilter {
    pub tenant: Option<String>,
    pub academic_year: Option<i32>,
    pub academic_year_before: Option<i32>,
    pub promotion_status: Option<PromotionStatus>,
    pub promotion_eligible: Option<bool>,
    pub is_final_year: Option<bool>,
    pub is_active: Option<bool>,
    pub previous_class: Option<Uuid>,
    pub last_promoted_year: Option<i32>,
}

impl ClassFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classes the annual batch should promote into `target_year`
    pub fn promotion_candidates(target_year: i32) -> Self {
        Self::new()
            .year_before(target_year)
            .status(PromotionStatus::Ready)
            .eligible(true)
            .final_year(false)
            .active(true)
    }

    /// Classes already created as successors of `class_id` for `year`
    pub fn successors_of(class_id: Uuid, year: i32) -> Self {
        Self {
            previous_class: Some(class_id),
            academic_year: Some(year),
            ..Self::default()
        }
    }

    pub fn tenant(mut self, tenant: Option<String>) -> Self {
        self.tenant = tenant;
        self
    }

    pub fn year_before(mut self, year: i32) -> Self {
        self.academic_year_before = Some(year);
        self
    }

    pub fn status(mut self, status: PromotionStatus) -> Self {
        self.promotion_status = Some(status);
        self
    }

    pub fn eligible(mut self, eligible: bool) -> Self {
        self.promotion_eligible = Some(eligible);
        self
    }

    pub fn final_year(mut self, is_final: bool) -> Self {
        self.is_final_year = Some(is_final);
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    pub fn without_active(mut self) -> Self {
        self.is_active = None;
        self
    }

    pub fn promoted_in(mut self, year: i32) -> Self {
        self.last_promoted_year = Some(year);
        self
    }

    pub fn matches(&self, class: &Class) -> bool {
        fn check<T: PartialEq>(want: &Option<T>, have: &T) -> bool {
            want.as_ref().map_or(true, |w| w == have)
        }

        check(&self.tenant, &class.tenant)
            && check(&self.academic_year, &class.academic_year)
            && self.academic_year_before.map_or(true, |y| class.academic_year < y)
            && check(&self.promotion_status, &class.promotion_status)
            && check(&self.promotion_eligible, &class.promotion_eligible)
            && check(&self.is_final_year, &class.is_final_year)
            && check(&self.is_active, &class.is_active)
            && self.previous_class.map_or(true, |id| class.lineage.previous_class == Some(id))
            && self.last_promoted_year.map_or(true, |y| class.last_promoted_year == Some(y))
    }

    /// WHERE clause body (without the keyword) with `$n` placeholders starting
    /// after `offset` existing parameters.
    pub fn to_where_sql(&self, offset: usize) -> SqlResult {
        let mut clauses: Vec<String> = Vec::new();
        let mut params: Vec<FilterValue> = Vec::new();

        let mut push = |column: &str, op: &str, value: FilterValue| {
            params.push(value);
            clauses.push(format!("\"{}\" {} ${}", column, op, offset + params.len()));
        };

        if let Some(ref tenant) = self.tenant {
            push("tenant", "=", FilterValue::Text(tenant.clone()));
        }
        if let Some(year) = self.academic_year {
            push("academic_year", "=", FilterValue::Int(year));
        }
        if let Some(year) = self.academic_year_before {
            push("academic_year", "<", FilterValue::Int(year));
        }
        if let Some(status) = self.promotion_status {
            push("promotion_status", "=", FilterValue::Text(status.as_str().to_string()));
        }
        if let Some(eligible) = self.promotion_eligible {
            push("promotion_eligible", "=", FilterValue::Bool(eligible));
        }
        if let Some(is_final) = self.is_final_year {
            push("is_final_year", "=", FilterValue::Bool(is_final));
        }
        if let Some(active) = self.is_active {
            push("is_active", "=", FilterValue::Bool(active));
        }
        if let Some(id) = self.previous_class {
            push("previous_class_id", "=", FilterValue::Uuid(id));
        }
        if let Some(year) = self.last_promoted_year {
            push("last_promoted_year", "=", FilterValue::Int(year));
        }

        let query = if clauses.is_empty() {
            "TRUE".to_string()
        } else {
            clauses.join(" AND ")
        };
        SqlResult { query, params }
    }

    /// Stable ordering shared by both stores: oldest year first, then name
    pub fn order_sql() -> String {
        format!(
            "ORDER BY \"academic_year\" {}, \"class_name\" {}",
            SortDirection::Asc.to_sql(),
            SortDirection::Asc.to_sql()
        )
    }

    pub fn sort(classes: &mut [Class]) {
        classes.sort_by(|a, b| {
            a.academic_year
                .cmp(&b.academic_year)
                .then_with(|| a.class_name.cmp(&b.class_name))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(year: i32) -> Class {
        let mut c = Class::new("school-a", year, Uuid::new_v4());
        c.promotion_status = PromotionStatus::Ready;
        c
    }

    #[test]
    fn candidate_filter_excludes_final_year_and_future_classes() {
        let filter = ClassFilter::promotion_candidates(2025);
        assert!(filter.matches(&class(2024)));
        assert!(!filter.matches(&class(2025)));

        let mut final_year = class(2024);
        final_year.is_final_year = true;
        assert!(!filter.matches(&final_year));

        let mut active = class(2024);
        active.promotion_status = PromotionStatus::Active;
        assert!(!filter.matches(&active));
    }

    #[test]
    fn tenant_narrowing() {
        let filter = ClassFilter::promotion_candidates(2025).tenant(Some("school-b".into()));
        assert!(!filter.matches(&class(2024)));
    }

    #[test]
    fn successor_filter_matches_lineage_pointer() {
        let source = Uuid::new_v4();
        let mut successor = class(2025);
        successor.lineage.previous_class = Some(source);

        assert!(ClassFilter::successors_of(source, 2025).matches(&successor));
        assert!(!ClassFilter::successors_of(source, 2026).matches(&successor));
        assert!(!ClassFilter::successors_of(Uuid::new_v4(), 2025).matches(&successor));
    }

    #[test]
    fn renders_numbered_placeholders() {
        let sql = ClassFilter::promotion_candidates(2025)
            .tenant(Some("school-a".into()))
            .to_where_sql(0);
        assert_eq!(
            sql.query,
            "\"tenant\" = $1 AND \"academic_year\" < $2 AND \"promotion_status\" = $3 \
             AND \"promotion_eligible\" = $4 AND \"is_final_year\" = $5 AND \"is_active\" = $6"
        );
        assert_eq!(sql.params.len(), 6);
        assert_eq!(sql.params[2], FilterValue::Text("ready".into()));

        let offset = ClassFilter::successors_of(Uuid::nil(), 2025).to_where_sql(2);
        assert_eq!(offset.query, "\"academic_year\" = $3 AND \"previous_class_id\" = $4");
    }

    #[test]
    fn empty_filter_is_true() {
        assert_eq!(ClassFilter::new().to_where_sql(0).query, "TRUE");
    }
}

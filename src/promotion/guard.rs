use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::error::PromotionError;
use crate::config::PromotionConfig;
use crate::middleware::AuthUser;

/// Source of "now" for the promotion engine and its guard
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    fn current_year(&self) -> i32 {
        self.today().year()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Midnight UTC on the given date. Invalid dates fall back to the epoch.
    pub fn on(year: i32, month: u32, day: u32) -> Self {
        let instant = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .unwrap_or_default();
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Policy evaluated before a batch promotion is started
pub trait PromotionGuard: Send + Sync {
    fn check(&self, user: &AuthUser, today: NaiveDate) -> Result<(), PromotionError>;
}

/// Allows batch runs on one calendar day per year, or at any time for
/// callers holding an elevated role.
pub struct CalendarWindowGuard {
    pub month: u32,
    pub day: u32,
    pub elevated_roles: Vec<String>,
}

impl CalendarWindowGuard {
    pub fn from_config(config: &PromotionConfig) -> Self {
        Self {
            month: config.window_month,
            day: config.window_day,
            elevated_roles: config.elevated_roles.clone(),
        }
    }
}

impl PromotionGuard for CalendarWindowGuard {
    fn check(&self, user: &AuthUser, today: NaiveDate) -> Result<(), PromotionError> {
        if user.has_any_role(&self.elevated_roles) {
            return Ok(());
        }
        if today.month() == self.month && today.day() == self.day {
            return Ok(());
        }
        Err(PromotionError::Forbidden(format!(
            "Annual promotion may only run on {:02}-{:02} unless the caller holds an elevated role",
            self.month, self.day
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(roles: &[&str]) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            name: "Head Teacher".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            tenants: vec![],
        }
    }

    fn guard() -> CalendarWindowGuard {
        CalendarWindowGuard::from_config(&PromotionConfig::default())
    }

    #[test]
    fn open_on_new_year_only() {
        let jan_first = FixedClock::on(2025, 1, 1).today();
        let mid_march = FixedClock::on(2025, 3, 14).today();

        assert!(guard().check(&user(&["admin"]), jan_first).is_ok());
        assert!(matches!(
            guard().check(&user(&["admin"]), mid_march),
            Err(PromotionError::Forbidden(_))
        ));
    }

    #[test]
    fn elevated_role_bypasses_the_window() {
        let mid_march = FixedClock::on(2025, 3, 14).today();
        assert!(guard().check(&user(&["super-admin"]), mid_march).is_ok());
    }

    #[test]
    fn fixed_clock_reports_its_year() {
        assert_eq!(FixedClock::on(2024, 6, 30).current_year(), 2024);
    }
}

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Menstruation,
    Follicular,
    Ovulation,
    Luteal,
}

impl CyclePhase {
    pub const ALL: [CyclePhase; 4] = [
        CyclePhase::Menstruation,
        CyclePhase::Follicular,
        CyclePhase::Ovulation,
        CyclePhase::Luteal,
    ];

    /// Short display label, as shown in the calendar legend.
    pub fn label(self) -> &'static str {
        match self {
            CyclePhase::Menstruation => "Period",
            CyclePhase::Follicular => "Follicular",
            CyclePhase::Ovulation => "Ovulation",
            CyclePhase::Luteal => "Luteal",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FlowIntensity {
    Spotting,
    Light,
    Medium,
    Heavy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Happy,
    Sensitive,
    Sad,
    Anxious,
    Energetic,
    Irritable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalSymptom {
    Cramps,
    Headache,
    Bloating,
    BreastTenderness,
    Acne,
    Fatigue,
    Backache,
    Nausea,
}

/// What the user is tracking for. Informational only; it never feeds the math.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    #[default]
    Track,
    Conceive,
    Pregnancy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSettings {
    pub average_cycle_length: u32,
    pub average_period_length: u32,
    /// Start of the most recently known period; anchor for all cycle math.
    pub last_period_date: NaiveDate,
    #[serde(default)]
    pub goal: Goal,
    #[serde(default = "default_notifications")]
    pub notifications_enabled: bool,
}

fn default_notifications() -> bool {
    true
}

impl UserSettings {
    pub const DEFAULT_CYCLE_LENGTH: u32 = 28;
    pub const DEFAULT_PERIOD_LENGTH: u32 = 5;

    /// Fresh settings anchored on `today`.
    pub fn anchored_on(today: NaiveDate) -> Self {
        Self {
            average_cycle_length: Self::DEFAULT_CYCLE_LENGTH,
            average_period_length: Self::DEFAULT_PERIOD_LENGTH,
            last_period_date: today,
            goal: Goal::Track,
            notifications_enabled: true,
        }
    }
}

impl Default for UserSettings {
    fn default() -> Self {
        Self::anchored_on(chrono::Local::now().date_naive())
    }
}

/// One menstrual cycle. Open while `end_date` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Inclusive day count, fixed when the record is closed.
    #[serde(default)]
    pub length: Option<i64>,
}

impl CycleRecord {
    pub fn open(start_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_date,
            end_date: None,
            length: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayLog {
    pub date: NaiveDate,
    pub is_period: bool,
    #[serde(default)]
    pub flow_intensity: Option<FlowIntensity>,
    #[serde(default)]
    pub moods: BTreeSet<Mood>,
    #[serde(default)]
    pub symptoms: BTreeSet<PhysicalSymptom>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sleep_hours: Option<f32>,
    #[serde(default)]
    pub water_intake: Option<u32>,
}

impl DayLog {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            is_period: false,
            flow_intensity: None,
            moods: BTreeSet::new(),
            symptoms: BTreeSet::new(),
            notes: None,
            sleep_hours: None,
            water_intake: None,
        }
    }
}

/// Partial update of an existing day log. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct DayLogPatch {
    pub is_period: Option<bool>,
    pub flow_intensity: Option<Option<FlowIntensity>>,
    pub moods: Option<BTreeSet<Mood>>,
    pub symptoms: Option<BTreeSet<PhysicalSymptom>>,
    pub notes: Option<Option<String>>,
    pub sleep_hours: Option<Option<f32>>,
    pub water_intake: Option<Option<u32>>,
}

/// Partial update of the user settings. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub average_cycle_length: Option<u32>,
    pub average_period_length: Option<u32>,
    pub last_period_date: Option<NaiveDate>,
    pub goal: Option<Goal>,
    pub notifications_enabled: Option<bool>,
}

/// Derived snapshot of the current cycle. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleStats {
    pub average_cycle_length: i64,
    pub average_period_length: i64,
    pub next_period_date: NaiveDate,
    pub ovulation_date: NaiveDate,
    pub fertile_window_start: NaiveDate,
    pub fertile_window_end: NaiveDate,
    pub current_phase: CyclePhase,
    /// 1-indexed.
    pub day_in_cycle: i64,
}

/// Countdown to the next projected events relative to a given day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpcomingEvents {
    pub next_period_date: NaiveDate,
    pub days_until_period: i64,
    pub ovulation_date: NaiveDate,
    pub days_until_ovulation: i64,
    pub in_fertile_window: bool,
}

/// Share of the cycle ring covered by one phase, as fractions of the cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseSegment {
    pub phase: CyclePhase,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Insights {
    pub avg_cycle_length: i64,
    pub total_cycles: usize,
    pub total_logs: usize,
    pub top_mood: Option<Mood>,
    pub top_symptom: Option<PhysicalSymptom>,
    pub days_until_next_period: i64,
}

/// Everything that is persisted under the single storage identifier.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppData {
    #[serde(default)]
    pub is_onboarded: bool,
    pub settings: UserSettings,
    #[serde(default)]
    pub cycles: Vec<CycleRecord>,
    #[serde(default)]
    pub day_logs: BTreeMap<NaiveDate, DayLog>,
}

impl AppData {
    /// Fresh, not-yet-onboarded state anchored on `today`.
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            is_onboarded: false,
            settings: UserSettings::anchored_on(today),
            cycles: Vec::new(),
            day_logs: BTreeMap::new(),
        }
    }

    pub fn open_cycle(&self) -> Option<&CycleRecord> {
        self.cycles.last().filter(|c| c.is_open())
    }
}

/// One cell of the month grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub phase: CyclePhase,
    pub is_period: bool,
}

/// Data for a month view, weeks running Sunday to Saturday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthData {
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
}

impl MonthData {
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay]> {
        self.days.chunks(7)
    }
}

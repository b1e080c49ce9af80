use chrono::NaiveDate;

use crate::calendar;
use crate::error::{Error, Result};
use crate::models::*;
use crate::prediction;
use crate::storage::Store;

pub const CYCLE_LENGTH_RANGE: (u32, u32) = (21, 40);
pub const PERIOD_LENGTH_RANGE: (u32, u32) = (2, 10);

/// Current local calendar date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Store `log` as the only log for its date, replacing any previous one whole.
pub fn upsert_day_log(data: &mut AppData, log: DayLog) {
    tracing::debug!(date = %log.date, "saving day log");
    data.day_logs.insert(log.date, log);
}

/// Merge `patch` into the log for `date`. Returns false if there is none.
pub fn update_day_log(data: &mut AppData, date: NaiveDate, patch: DayLogPatch) -> bool {
    let Some(log) = data.day_logs.get_mut(&date) else {
        return false;
    };

    if let Some(is_period) = patch.is_period {
        log.is_period = is_period;
    }
    if let Some(flow) = patch.flow_intensity {
        log.flow_intensity = flow;
    }
    if let Some(moods) = patch.moods {
        log.moods = moods;
    }
    if let Some(symptoms) = patch.symptoms {
        log.symptoms = symptoms;
    }
    if let Some(notes) = patch.notes {
        log.notes = notes;
    }
    if let Some(sleep) = patch.sleep_hours {
        log.sleep_hours = sleep;
    }
    if let Some(water) = patch.water_intake {
        log.water_intake = water;
    }
    true
}

/// Mark `date` as a period day and open a new cycle there unless one is open.
///
/// Opening a cycle moves the settings anchor to `date`. A date earlier than
/// the latest recorded start, or on or before the end of the latest closed
/// cycle, is rejected so records never overlap and the open one stays last.
pub fn start_period(data: &mut AppData, date: NaiveDate) -> Result<()> {
    if let Some(last) = data.cycles.last() {
        if date < last.start_date {
            return Err(Error::InvalidArgument(format!(
                "period start {date} is before the latest recorded start {}",
                last.start_date
            )));
        }
        if let Some(end) = last.end_date.filter(|end| date <= *end) {
            return Err(Error::InvalidArgument(format!(
                "period start {date} falls inside the cycle {} to {end}",
                last.start_date
            )));
        }
    }

    let log = data
        .day_logs
        .entry(date)
        .or_insert_with(|| DayLog::empty(date));
    log.is_period = true;
    log.flow_intensity = Some(FlowIntensity::Medium);

    if data.open_cycle().is_some() {
        tracing::debug!(%date, "cycle already open, only logging the day");
        return Ok(());
    }

    data.cycles.push(CycleRecord::open(date));
    data.settings.last_period_date = date;
    tracing::info!(%date, "period started");
    Ok(())
}

/// Close the open cycle on `date`. Returns false, changing nothing, when no
/// cycle is open.
pub fn end_period(data: &mut AppData, date: NaiveDate) -> Result<bool> {
    let Some(cycle) = data.cycles.last_mut().filter(|c| c.is_open()) else {
        tracing::debug!(%date, "no open cycle to end");
        return Ok(false);
    };

    if date < cycle.start_date {
        return Err(Error::InvalidArgument(format!(
            "period end {date} is before its start {}",
            cycle.start_date
        )));
    }

    let length = (date - cycle.start_date).num_days() + 1;
    cycle.end_date = Some(date);
    cycle.length = Some(length);
    tracing::info!(%date, length, "period ended");
    Ok(true)
}

/// Apply a settings patch, clamping lengths to what the onboarding form allows.
pub fn apply_settings(settings: &mut UserSettings, patch: SettingsPatch) {
    if let Some(cycle) = patch.average_cycle_length {
        settings.average_cycle_length = cycle.clamp(CYCLE_LENGTH_RANGE.0, CYCLE_LENGTH_RANGE.1);
    }
    if let Some(period) = patch.average_period_length {
        settings.average_period_length =
            period.clamp(PERIOD_LENGTH_RANGE.0, PERIOD_LENGTH_RANGE.1);
    }
    if let Some(date) = patch.last_period_date {
        settings.last_period_date = date;
    }
    if let Some(goal) = patch.goal {
        settings.goal = goal;
    }
    if let Some(enabled) = patch.notifications_enabled {
        settings.notifications_enabled = enabled;
    }
}

/// Owner of the in-memory state and its store.
///
/// Every mutation saves the whole state before returning. Queries are
/// evaluated against `today`, which the host sets explicitly.
pub struct Tracker {
    store: Store,
    data: AppData,
    today: NaiveDate,
}

impl Tracker {
    /// Load saved state, or start fresh and not onboarded.
    pub fn load(store: Store, today: NaiveDate) -> Result<Self> {
        let data = match store.load()? {
            Some(data) => data,
            None => {
                tracing::info!(dir = ?store.dir(), "starting with fresh state");
                AppData::fresh(today)
            }
        };
        Ok(Self { store, data, today })
    }

    pub fn save(&self) -> Result<()> {
        self.store.save(&self.data)?;
        Ok(())
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn settings(&self) -> &UserSettings {
        &self.data.settings
    }

    pub fn cycles(&self) -> &[CycleRecord] {
        &self.data.cycles
    }

    pub fn is_onboarded(&self) -> bool {
        self.data.is_onboarded
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn complete_onboarding(&mut self, patch: SettingsPatch) -> Result<()> {
        apply_settings(&mut self.data.settings, patch);
        self.data.is_onboarded = true;
        tracing::info!("onboarding complete");
        self.save()
    }

    pub fn set_onboarded(&mut self, value: bool) -> Result<()> {
        self.data.is_onboarded = value;
        self.save()
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<()> {
        apply_settings(&mut self.data.settings, patch);
        self.save()
    }

    pub fn save_day_log(&mut self, log: DayLog) -> Result<()> {
        upsert_day_log(&mut self.data, log);
        self.save()
    }

    pub fn update_day_log(&mut self, date: NaiveDate, patch: DayLogPatch) -> Result<bool> {
        let updated = update_day_log(&mut self.data, date, patch);
        if updated {
            self.save()?;
        }
        Ok(updated)
    }

    pub fn day_log(&self, date: NaiveDate) -> Option<&DayLog> {
        self.data.day_logs.get(&date)
    }

    pub fn start_period(&mut self, date: Option<NaiveDate>) -> Result<()> {
        start_period(&mut self.data, date.unwrap_or(self.today))?;
        self.save()
    }

    pub fn end_period(&mut self, date: Option<NaiveDate>) -> Result<bool> {
        let closed = end_period(&mut self.data, date.unwrap_or(self.today))?;
        if closed {
            self.save()?;
        }
        Ok(closed)
    }

    pub fn stats(&self) -> Result<CycleStats> {
        prediction::compute_stats(&self.data.settings, &self.data.cycles, self.today)
    }

    pub fn phase_for_date(&self, date: NaiveDate) -> Result<CyclePhase> {
        prediction::phase_for_date(date, &self.data.settings)
    }

    pub fn upcoming(&self) -> Result<UpcomingEvents> {
        Ok(prediction::upcoming_events(&self.stats()?, self.today))
    }

    pub fn phase_segments(&self) -> Result<Vec<PhaseSegment>> {
        Ok(prediction::phase_segments(&self.stats()?))
    }

    pub fn insights(&self) -> Result<Insights> {
        let stats = self.stats()?;
        Ok(prediction::insights(
            &stats,
            &self.data.cycles,
            &self.data.day_logs,
        ))
    }

    pub fn month(&self, year: i32, month: u32) -> Result<MonthData> {
        calendar::month_view(
            year,
            month,
            &self.data.settings,
            &self.data.day_logs,
            self.today,
        )
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.data)?)
    }

    /// Wipe everything on disk and go back to a fresh, not onboarded state.
    pub fn clear_all_data(&mut self) -> Result<()> {
        self.store.wipe()?;
        self.data = AppData::fresh(self.today);
        tracing::info!("all data cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;
    use std::collections::BTreeSet;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tracker(dir: &std::path::Path) -> Tracker {
        logging::init_test();
        Tracker::load(Store::new(dir, None), date("2024-02-10")).unwrap()
    }

    #[test]
    fn period_lifecycle_closes_once() {
        let mut data = AppData::fresh(date("2024-01-01"));
        start_period(&mut data, date("2024-02-01")).unwrap();
        assert!(end_period(&mut data, date("2024-02-05")).unwrap());

        assert_eq!(data.cycles.len(), 1);
        let cycle = &data.cycles[0];
        assert_eq!(cycle.start_date, date("2024-02-01"));
        assert_eq!(cycle.end_date, Some(date("2024-02-05")));
        assert_eq!(cycle.length, Some(5));

        let before = data.clone();
        assert!(!end_period(&mut data, date("2024-02-07")).unwrap());
        assert_eq!(data, before);
    }

    #[test]
    fn start_period_logs_the_day_and_moves_anchor() {
        let mut data = AppData::fresh(date("2024-01-01"));
        let mut existing = DayLog::empty(date("2024-02-01"));
        existing.moods.insert(Mood::Sad);
        upsert_day_log(&mut data, existing);

        start_period(&mut data, date("2024-02-01")).unwrap();

        let log = &data.day_logs[&date("2024-02-01")];
        assert!(log.is_period);
        assert_eq!(log.flow_intensity, Some(FlowIntensity::Medium));
        assert!(log.moods.contains(&Mood::Sad));
        assert_eq!(data.settings.last_period_date, date("2024-02-01"));
        assert!(data.open_cycle().is_some());
    }

    #[test]
    fn start_period_with_open_cycle_does_not_open_another() {
        let mut data = AppData::fresh(date("2024-01-01"));
        start_period(&mut data, date("2024-02-01")).unwrap();
        start_period(&mut data, date("2024-02-02")).unwrap();

        assert_eq!(data.cycles.len(), 1);
        assert_eq!(data.settings.last_period_date, date("2024-02-01"));
        assert!(data.day_logs[&date("2024-02-02")].is_period);
    }

    #[test]
    fn out_of_order_dates_are_rejected() {
        let mut data = AppData::fresh(date("2024-01-01"));
        start_period(&mut data, date("2024-02-01")).unwrap();
        assert!(matches!(
            end_period(&mut data, date("2024-01-30")),
            Err(Error::InvalidArgument(_))
        ));
        assert!(data.cycles[0].is_open());

        end_period(&mut data, date("2024-02-04")).unwrap();
        let before = data.clone();
        assert!(matches!(
            start_period(&mut data, date("2024-01-15")),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(data, before);
    }

    #[test]
    fn start_inside_a_closed_cycle_is_rejected() {
        let mut data = AppData::fresh(date("2024-01-01"));
        start_period(&mut data, date("2024-02-01")).unwrap();
        end_period(&mut data, date("2024-02-05")).unwrap();

        let before = data.clone();
        for inside in ["2024-02-01", "2024-02-03", "2024-02-05"] {
            assert!(matches!(
                start_period(&mut data, date(inside)),
                Err(Error::InvalidArgument(_))
            ));
            assert_eq!(data, before);
        }

        start_period(&mut data, date("2024-02-06")).unwrap();
        assert_eq!(data.cycles.len(), 2);
        assert!(data.cycles[1].is_open());
    }

    #[test]
    fn saving_a_day_twice_keeps_only_the_latest() {
        let mut data = AppData::fresh(date("2024-01-01"));
        let mut first = DayLog::empty(date("2024-01-03"));
        first.moods = BTreeSet::from([Mood::Happy, Mood::Energetic]);
        first.symptoms = BTreeSet::from([PhysicalSymptom::Acne]);
        upsert_day_log(&mut data, first);

        let mut second = DayLog::empty(date("2024-01-03"));
        second.moods = BTreeSet::from([Mood::Anxious]);
        upsert_day_log(&mut data, second.clone());

        assert_eq!(data.day_logs.len(), 1);
        assert_eq!(data.day_logs[&date("2024-01-03")], second);
    }

    #[test]
    fn update_day_log_merges_given_fields() {
        let mut data = AppData::fresh(date("2024-01-01"));
        let mut log = DayLog::empty(date("2024-01-03"));
        log.moods.insert(Mood::Happy);
        log.notes = Some("long walk".into());
        upsert_day_log(&mut data, log);

        let patch = DayLogPatch {
            symptoms: Some(BTreeSet::from([PhysicalSymptom::Headache])),
            sleep_hours: Some(Some(7.5)),
            ..Default::default()
        };
        assert!(update_day_log(&mut data, date("2024-01-03"), patch));

        let log = &data.day_logs[&date("2024-01-03")];
        assert!(log.moods.contains(&Mood::Happy));
        assert!(log.symptoms.contains(&PhysicalSymptom::Headache));
        assert_eq!(log.notes.as_deref(), Some("long walk"));
        assert_eq!(log.sleep_hours, Some(7.5));

        assert!(!update_day_log(&mut data, date("2024-01-04"), DayLogPatch::default()));
        assert_eq!(data.day_logs.len(), 1);
    }

    #[test]
    fn settings_patch_clamps_lengths() {
        let mut settings = UserSettings::anchored_on(date("2024-01-01"));
        apply_settings(
            &mut settings,
            SettingsPatch {
                average_cycle_length: Some(60),
                average_period_length: Some(1),
                goal: Some(Goal::Conceive),
                ..Default::default()
            },
        );
        assert_eq!(settings.average_cycle_length, 40);
        assert_eq!(settings.average_period_length, 2);
        assert_eq!(settings.goal, Goal::Conceive);
        assert!(settings.notifications_enabled);
    }

    #[test]
    fn fresh_tracker_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let t = tracker(dir.path());
        assert!(!t.is_onboarded());
        assert_eq!(t.settings().average_cycle_length, 28);
        assert_eq!(t.settings().average_period_length, 5);
        assert_eq!(t.settings().last_period_date, date("2024-02-10"));
        assert_eq!(t.settings().goal, Goal::Track);
        assert!(t.settings().notifications_enabled);
        assert_eq!(t.stats().unwrap().day_in_cycle, 1);
    }

    #[test]
    fn mutations_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut t = tracker(dir.path());
            t.complete_onboarding(SettingsPatch {
                average_cycle_length: Some(30),
                last_period_date: Some(date("2024-01-05")),
                ..Default::default()
            })
            .unwrap();
            t.start_period(Some(date("2024-02-03"))).unwrap();
            t.end_period(Some(date("2024-02-07"))).unwrap();
        }

        let t = tracker(dir.path());
        assert!(t.is_onboarded());
        assert_eq!(t.settings().average_cycle_length, 30);
        assert_eq!(t.settings().last_period_date, date("2024-02-03"));
        assert_eq!(t.cycles().len(), 1);
        assert_eq!(t.cycles()[0].length, Some(5));
        assert!(t.day_log(date("2024-02-03")).unwrap().is_period);
    }

    #[test]
    fn start_defaults_to_today() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.set_today(date("2024-03-01"));
        t.start_period(None).unwrap();
        assert_eq!(t.cycles()[0].start_date, date("2024-03-01"));
        assert!(t.end_period(None).unwrap());
        assert_eq!(t.cycles()[0].length, Some(1));
    }

    #[test]
    fn clear_all_data_resets_onboarding() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.complete_onboarding(SettingsPatch::default()).unwrap();
        t.save_day_log(DayLog::empty(date("2024-02-09"))).unwrap();

        t.clear_all_data().unwrap();
        assert!(!t.is_onboarded());
        assert!(t.data().day_logs.is_empty());

        let reloaded = tracker(dir.path());
        assert!(!reloaded.is_onboarded());
        assert!(reloaded.data().cycles.is_empty());
    }

    #[test]
    fn export_contains_the_whole_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.start_period(Some(date("2024-02-01"))).unwrap();

        let exported: AppData = serde_json::from_str(&t.export_json().unwrap()).unwrap();
        assert_eq!(&exported, t.data());
    }

    #[test]
    fn views_follow_the_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = tracker(dir.path());
        t.update_settings(SettingsPatch {
            last_period_date: Some(date("2024-02-01")),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(t.phase_for_date(date("2024-02-02")).unwrap(), CyclePhase::Menstruation);
        assert_eq!(t.upcoming().unwrap().days_until_period, 19);
        assert_eq!(t.phase_segments().unwrap().len(), 4);
        assert_eq!(t.insights().unwrap().total_logs, 0);
        assert_eq!(t.month(2024, 2).unwrap().days.len(), 35);
    }
}

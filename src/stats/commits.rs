// Commit pattern analysis.
// Derives activity histograms, streaks, and behaviour flags from push events.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::github::Event;

/// Late-night hours, local time.
const NIGHT_HOURS: [u32; 6] = [22, 23, 0, 1, 2, 3];
/// Early-morning hours, local time.
const EARLY_HOURS: [u32; 4] = [5, 6, 7, 8];

/// Activity statistics for one account's recent pushes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitStats {
    pub total_commits: u32,
    /// Indexed from Sunday (0) to Saturday (6).
    pub commits_by_day_of_week: [u32; 7],
    /// Indexed by local hour.
    pub commits_by_hour: [u32; 24],
    /// `None` when there are no commits. Ties go to the earliest day from Sunday.
    pub most_active_day: Option<Weekday>,
    /// `None` when there are no commits. Ties go to the earliest hour.
    pub most_active_hour: Option<u32>,
    /// Current run of consecutive commit days ending today or yesterday.
    pub streak_days: u32,
    pub longest_streak: u32,
    pub commit_dates: BTreeSet<NaiveDate>,
    /// Commits per distinct active day.
    pub average_commits_per_day: f64,
    pub weekend_warrior: bool,
    pub night_owl: bool,
    pub early_bird: bool,
}

impl CommitStats {
    /// Analyze events in the machine's local timezone.
    pub fn from_events_local(events: &[Event], now: DateTime<Utc>) -> Self {
        let today = now.with_timezone(&Local).date_naive();
        Self::from_events(events, &Local, today)
    }

    /// Analyze push events as seen in `tz`, with `today` anchoring the
    /// current streak. Non-push events are ignored.
    pub fn from_events<Tz: TimeZone>(events: &[Event], tz: &Tz, today: NaiveDate) -> Self {
        let mut stats = CommitStats::default();

        for event in events.iter().filter(|e| e.is_push()) {
            let local = event.created_at.with_timezone(tz);
            let commits = event.commit_count();

            stats.total_commits += commits;
            stats.commits_by_day_of_week[local.weekday().num_days_from_sunday() as usize] +=
                commits;
            stats.commits_by_hour[local.hour() as usize] += commits;
            stats.commit_dates.insert(local.date_naive());
        }

        stats.most_active_day = argmax(&stats.commits_by_day_of_week).map(weekday_from_sunday);
        stats.most_active_hour = argmax(&stats.commits_by_hour).map(|h| h as u32);

        stats.longest_streak = longest_streak(&stats.commit_dates);
        stats.streak_days = current_streak(&stats.commit_dates, today);

        if !stats.commit_dates.is_empty() {
            stats.average_commits_per_day =
                f64::from(stats.total_commits) / stats.commit_dates.len() as f64;
        }

        let night = sum_hours(&stats.commits_by_hour, &NIGHT_HOURS);
        let early = sum_hours(&stats.commits_by_hour, &EARLY_HOURS);
        let rest = stats.total_commits - night - early;
        stats.night_owl = night > 0 && night > early && night > rest;
        stats.early_bird = early > 0 && early > night && early > rest;

        // Weekend share above the 2/7 a uniform spread would give
        let weekend = stats.commits_by_day_of_week[0] + stats.commits_by_day_of_week[6];
        stats.weekend_warrior =
            stats.total_commits > 0 && u64::from(weekend) * 7 > u64::from(stats.total_commits) * 2;

        stats
    }

    /// Short label for the dashboard narrative.
    pub fn personality(&self) -> &'static str {
        if self.night_owl {
            "Night Owl"
        } else if self.early_bird {
            "Early Bird"
        } else if self.weekend_warrior {
            "Weekend Warrior"
        } else if self.total_commits == 0 {
            "Just Getting Started"
        } else {
            "Steady Coder"
        }
    }
}

/// Index of the first maximum, or `None` if every bucket is zero.
fn argmax(buckets: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, &count) in buckets.iter().enumerate() {
        if count > best.map_or(0, |(_, c)| c) {
            best = Some((i, count));
        }
    }
    best.map(|(i, _)| i)
}

fn weekday_from_sunday(index: usize) -> Weekday {
    match index {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

fn sum_hours(by_hour: &[u32; 24], hours: &[u32]) -> u32 {
    hours.iter().map(|&h| by_hour[h as usize]).sum()
}

fn longest_streak(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut prev: Option<NaiveDate> = None;

    for &date in dates {
        run = match prev {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }

    longest
}

/// Run of consecutive days ending today, or yesterday if there is nothing
/// today yet. Anything older counts as lapsed. Dates after `today` are
/// ignored.
fn current_streak(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if dates.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut day = Some(anchor);
    while let Some(d) = day {
        if !dates.contains(&d) {
            break;
        }
        streak += 1;
        day = d.pred_opt();
    }
    streak
}

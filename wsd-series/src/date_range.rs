use chrono::{Duration, NaiveDate};
use std::iter::Iterator;
use std::mem::replace;

/// Inclusive range of calendar days, iterated one day at a time.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct DateRange(pub NaiveDate, pub NaiveDate);

impl DateRange {
    /// Number of days covered, counting both ends. Zero when start > end.
    pub fn len_days(&self) -> usize {
        let days = (self.1 - self.0).num_days();
        if days < 0 {
            0
        } else {
            days as usize + 1
        }
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.0 <= *date && *date <= self.1
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 <= self.1 {
            let next = self.0 + Duration::days(1);
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DateRange;
    use chrono::NaiveDate;

    #[test]
    fn test_date_range_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2020, 2, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let range = DateRange(start, end);
        assert_eq!(range.len_days(), 4);
        let days: Vec<NaiveDate> = range.collect();
        assert_eq!(days.len(), 4);
        assert_eq!(days[2], NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
        assert_eq!(*days.last().unwrap(), end);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let range = DateRange(start, end);
        assert_eq!(range.len_days(), 0);
        assert!(!range.contains(&start));
        assert_eq!(range.count(), 0);
    }
}

use chrono::NaiveDate;

/// One acquisition date and the raster source holding its band stack.
#[derive(Debug, Clone)]
pub struct Acquisition<S> {
    pub date: NaiveDate,
    pub source: S,
}

impl<S> Acquisition<S> {
    pub fn new(date: NaiveDate, source: S) -> Self {
        Self { date, source }
    }
}

// Line chart domain model

const DEFAULT_DATASET_LABEL: &str = "Data";
const DEFAULT_BORDER_COLOR: &str = "rgb(75, 192, 192)";
const DEFAULT_TENSION: f64 = 0.1;

/// How many points a chart keeps before dropping the oldest ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    #[default]
    Unbounded,
    Window(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub border_color: String,
    pub tension: f64,
}

impl Dataset {
    pub fn new(label: String, border_color: String, tension: f64) -> Self {
        Self {
            label,
            data: Vec::new(),
            border_color,
            tension,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub y_begin_at_zero: bool,
}

/// A scrolling line chart: one label per point, shared by every dataset.
///
/// `labels.len()` equals the length of every dataset's `data` at all times.
#[derive(Debug, Clone)]
pub struct LineChart {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub options: ChartOptions,
    retention: Retention,
    revision: u64,
}

impl LineChart {
    pub fn new(retention: Retention) -> Self {
        Self {
            labels: Vec::new(),
            datasets: vec![Dataset::new(
                DEFAULT_DATASET_LABEL.to_string(),
                DEFAULT_BORDER_COLOR.to_string(),
                DEFAULT_TENSION,
            )],
            options: ChartOptions { y_begin_at_zero: true },
            retention,
            revision: 0,
        }
    }

    /// Append one point to every dataset under a single label.
    pub fn push_point(&mut self, label: String, value: f64) {
        self.labels.push(label);
        for dataset in &mut self.datasets {
            dataset.data.push(value);
        }
        self.apply_retention();
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        for dataset in &mut self.datasets {
            dataset.data.clear();
        }
    }

    /// Mark the chart as needing a redraw.
    pub fn update(&mut self) {
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn latest(&self) -> Option<(&str, f64)> {
        let label = self.labels.last()?;
        let value = self.datasets.first()?.data.last()?;
        Some((label.as_str(), *value))
    }

    fn apply_retention(&mut self) {
        let Retention::Window(limit) = self.retention else {
            return;
        };
        if self.labels.len() <= limit {
            return;
        }
        let excess = self.labels.len() - limit;
        self.labels.drain(..excess);
        for dataset in &mut self.datasets {
            let excess = dataset.data.len().saturating_sub(limit);
            dataset.data.drain(..excess);
        }
    }
}

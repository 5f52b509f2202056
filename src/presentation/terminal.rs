// Terminal rendering of the live chart
use crate::domain::chart::LineChart;

const SPARK_WIDTH: usize = 40;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn render_chart(chart: &LineChart, column: &str) {
    println!("{}", format_chart_line(chart, column));
}

pub fn format_chart_line(chart: &LineChart, column: &str) -> String {
    if chart.is_empty() {
        return format!("[{}] chart cleared", display_name(column));
    }
    match chart.latest() {
        None => format!("[{}] no data", display_name(column)),
        Some((label, value)) => format!(
            "{}  {} = {}  {} ({} points)",
            label,
            display_name(column),
            value,
            sparkline(chart),
            chart.len()
        ),
    }
}

fn display_name(column: &str) -> &str {
    if column.is_empty() { "-" } else { column }
}

/// Last points of the first dataset, scaled from zero since the y-axis begins there
fn sparkline(chart: &LineChart) -> String {
    let Some(dataset) = chart.datasets.first() else {
        return String::new();
    };
    let start = dataset.data.len().saturating_sub(SPARK_WIDTH);
    let window = &dataset.data[start..];

    let max = window.iter().cloned().fold(0.0_f64, f64::max);
    let min = if chart.options.y_begin_at_zero {
        window.iter().cloned().fold(0.0_f64, f64::min)
    } else {
        window.iter().cloned().fold(f64::INFINITY, f64::min)
    };
    let span = max - min;

    window
        .iter()
        .map(|v| {
            if span <= 0.0 {
                return SPARK_LEVELS[0];
            }
            let level = ((v - min) / span * (SPARK_LEVELS.len() - 1) as f64).round() as usize;
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)]
        })
        .collect()
}

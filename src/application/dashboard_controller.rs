// Dashboard controller - Reacts to feed events and user actions
use crate::domain::chart::{LineChart, Retention};
use crate::domain::events::{ClientEvent, DataTick, ServerEvent};
use crate::domain::selector::ColumnSelector;

/// Outbound side of the socket. Emits are fire-and-forget.
pub trait EventSink {
    fn emit(&mut self, event: ClientEvent);
}

/// Source of point labels
pub trait Clock {
    fn time_label(&self) -> String;
}

/// Wall-clock time in the `h:mm:ss AM` style
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn time_label(&self) -> String {
        chrono::Local::now().format("%-I:%M:%S %p").to_string()
    }
}

/// Owns the column picker and the chart for one socket connection.
///
/// The picker is multi-select and `submit_selected_columns` sends every
/// highlighted column, but the chart only follows the picker's value, i.e.
/// the first highlighted column.
pub struct DashboardController<S, C> {
    sink: S,
    clock: C,
    selector: ColumnSelector,
    chart: LineChart,
}

impl<S: EventSink, C: Clock> DashboardController<S, C> {
    pub fn new(sink: S, clock: C, retention: Retention) -> Self {
        Self {
            sink,
            clock,
            selector: ColumnSelector::new(),
            chart: LineChart::new(retention),
        }
    }

    pub fn selector(&self) -> &ColumnSelector {
        &self.selector
    }

    pub fn chart(&self) -> &LineChart {
        &self.chart
    }

    /// Dispatch one inbound socket event.
    pub fn handle(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::HeaderData(header) => self.receive_header_list(header),
            ServerEvent::SerialData(tick) => self.receive_data_tick(&tick),
            ServerEvent::ColumnsUpdated { columns } => {
                tracing::debug!("Server acknowledged columns: {:?}", columns);
            }
        }
    }

    pub fn receive_header_list(&mut self, header: Vec<String>) {
        tracing::debug!("Received header data: {:?}", header);
        self.selector.replace_options(header);
    }

    pub fn submit_selected_columns(&mut self) {
        let columns = self.selector.selected_values();
        self.sink.emit(ClientEvent::UpdateSelectedColumns(columns));
    }

    pub fn receive_data_tick(&mut self, tick: &DataTick) {
        let Some(value) = tick.get(self.selector.value()) else {
            return;
        };
        self.chart.push_point(self.clock.time_label(), *value);
        self.chart.update();
    }

    pub fn selection_changed(&mut self) {
        self.chart.clear();
        self.chart.update();
    }

    /// User highlights `columns` in the picker. Fires `selection_changed`
    /// when the highlighted set actually changed; returns whether it did.
    pub fn select_columns(&mut self, columns: &[String]) -> bool {
        let changed = self.selector.highlight(columns);
        if changed {
            self.selection_changed();
        }
        changed
    }
}

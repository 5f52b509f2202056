// Column picker domain model (multi-select semantics)

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOption {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

impl ColumnOption {
    pub fn new(name: String) -> Self {
        Self {
            text: name.clone(),
            value: name,
            selected: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColumnSelector {
    options: Vec<ColumnOption>,
}

impl ColumnSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every option (and its highlight) and add one per name, in order.
    pub fn replace_options(&mut self, names: Vec<String>) {
        self.options = names.into_iter().map(ColumnOption::new).collect();
    }

    pub fn options(&self) -> &[ColumnOption] {
        &self.options
    }

    /// Value of the first highlighted option, or an empty string when nothing is highlighted.
    pub fn value(&self) -> &str {
        self.options
            .iter()
            .find(|o| o.selected)
            .map(|o| o.value.as_str())
            .unwrap_or("")
    }

    pub fn selected_values(&self) -> Vec<String> {
        self.options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.clone())
            .collect()
    }

    /// Highlight exactly the options whose value is in `values`.
    /// Returns true when the highlighted set changed.
    pub fn highlight(&mut self, values: &[String]) -> bool {
        let mut changed = false;
        for option in &mut self.options {
            let selected = values.contains(&option.value);
            if option.selected != selected {
                option.selected = selected;
                changed = true;
            }
        }
        changed
    }
}

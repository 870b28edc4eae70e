//! Numbered menus whose index semantics are derived from the same counts
//! used to render the prompt. The raw reply "1" can mean different things
//! in different sessions, so the mapping is never hard-coded.

/// What a numeric selection actually means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    PersonDocument,
    CompanyDocument,
    ActiveProcesses,
    FinalizedProcesses,
    SummaryReport,
    RetryReport,
    NewInquiry,
    TalkToAgent,
    Finish,
}

impl MenuOption {
    fn label(&self) -> &'static str {
        match self {
            MenuOption::PersonDocument => "Individual taxpayer ID",
            MenuOption::CompanyDocument => "Company registration ID",
            MenuOption::ActiveProcesses => "See your active processes",
            MenuOption::FinalizedProcesses => "See your finalized processes",
            MenuOption::SummaryReport => "Receive a summary report",
            MenuOption::RetryReport => "Try the report again",
            MenuOption::NewInquiry => "Start a new inquiry",
            MenuOption::TalkToAgent => "Talk to one of our agents",
            MenuOption::Finish => "Finish",
        }
    }
}

/// An ordered option list plus the text prompt that rendered it.
#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub prompt: String,
    options: Vec<MenuOption>,
}

impl Menu {
    fn new(header: &str, options: Vec<MenuOption>) -> Self {
        let mut prompt = String::from(header);
        for (i, option) in options.iter().enumerate() {
            prompt.push_str(&format!("\n{}. {}", i + 1, option.label()));
        }
        Self { prompt, options }
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn options(&self) -> &[MenuOption] {
        &self.options
    }

    /// Maps a validated 1-based selection back to its semantic option.
    /// Total over `1..=len`; anything else is `None`.
    pub fn resolve(&self, index: usize) -> Option<MenuOption> {
        self.options.get(index.checked_sub(1)?).copied()
    }
}

/// Menu offered after a successful lookup. Options appear only when the
/// counts justify them: active iff `active > 0`, finalized iff
/// `finalized > 0`, report iff anything exists at all.
pub fn process_menu(active: usize, finalized: usize) -> Menu {
    let mut options = Vec::new();
    if active > 0 {
        options.push(MenuOption::ActiveProcesses);
    }
    if finalized > 0 {
        options.push(MenuOption::FinalizedProcesses);
    }
    if active + finalized > 0 {
        options.push(MenuOption::SummaryReport);
    }
    let header = format!(
        "We found {active} active and {finalized} finalized process(es) for that document. What would you like to do?"
    );
    Menu::new(&header, options)
}

pub fn document_type_menu() -> Menu {
    Menu::new(
        "Which document would you like to look up cases for?",
        vec![MenuOption::PersonDocument, MenuOption::CompanyDocument],
    )
}

pub fn report_success_menu() -> Menu {
    Menu::new(
        "Your report is on its way. Anything else?",
        vec![MenuOption::NewInquiry, MenuOption::Finish],
    )
}

pub fn report_error_menu() -> Menu {
    Menu::new(
        "We couldn't generate your report right now. How would you like to proceed?",
        vec![
            MenuOption::RetryReport,
            MenuOption::NewInquiry,
            MenuOption::TalkToAgent,
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_only() {
        let menu = process_menu(3, 0);
        assert_eq!(
            menu.options(),
            &[MenuOption::ActiveProcesses, MenuOption::SummaryReport]
        );
        assert_eq!(menu.resolve(1), Some(MenuOption::ActiveProcesses));
        assert_eq!(menu.resolve(2), Some(MenuOption::SummaryReport));
    }

    #[test]
    fn finalized_only() {
        let menu = process_menu(0, 2);
        assert_eq!(
            menu.options(),
            &[MenuOption::FinalizedProcesses, MenuOption::SummaryReport]
        );
        // index 1 means something different than in the active-only menu
        assert_eq!(menu.resolve(1), Some(MenuOption::FinalizedProcesses));
    }

    #[test]
    fn both_buckets() {
        let menu = process_menu(9, 1);
        assert_eq!(
            menu.options(),
            &[
                MenuOption::ActiveProcesses,
                MenuOption::FinalizedProcesses,
                MenuOption::SummaryReport
            ]
        );
        assert_eq!(menu.resolve(3), Some(MenuOption::SummaryReport));
    }

    #[test]
    fn nothing_found() {
        let menu = process_menu(0, 0);
        assert!(menu.is_empty());
        assert_eq!(menu.resolve(1), None);
    }

    #[test]
    fn resolve_is_total_over_option_range() {
        for (active, finalized) in [(3usize, 0usize), (0, 2), (9, 1)] {
            let menu = process_menu(active, finalized);
            for i in 1..=menu.len() {
                assert!(menu.resolve(i).is_some(), "index {i} must resolve");
            }
            assert_eq!(menu.resolve(0), None);
            assert_eq!(menu.resolve(menu.len() + 1), None);
        }
    }

    #[test]
    fn prompt_numbers_match_option_order() {
        let menu = process_menu(1, 1);
        let lines: Vec<&str> = menu.prompt.lines().collect();
        assert!(lines[1].starts_with("1. See your active processes"));
        assert!(lines[2].starts_with("2. See your finalized processes"));
        assert!(lines[3].starts_with("3. Receive a summary report"));
    }

    #[test]
    fn fixed_menus_resolve() {
        assert_eq!(report_error_menu().resolve(1), Some(MenuOption::RetryReport));
        assert_eq!(report_error_menu().resolve(3), Some(MenuOption::TalkToAgent));
        assert_eq!(report_success_menu().resolve(2), Some(MenuOption::Finish));
        assert_eq!(document_type_menu().resolve(2), Some(MenuOption::CompanyDocument));
    }
}

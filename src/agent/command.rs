//! Parsing of mention text into bot commands.

/// Usage hint for `answer` and `answer-all`.
pub const ANSWER_USAGE: &str = "To answer the question please provide the project name (example: sriov,metallb) and the openshift version (4.16,4.18, etc..)";

/// Usage hint for `inject`.
pub const INJECT_USAGE: &str = "To inject the last message in the thread please provide the project name (example: sriov,metallb) and the openshift version (4.16,4.18, etc..)";

/// Generic command list, posted for unrecognized input.
pub const HELP: &str = "Please use one of the following commands (answer,elaborate,inject)";

/// A parsed bot command.
///
/// Derived purely from the mention text; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Answer a question against a project/version index.
    Answer {
        /// Project name whose index to query.
        project: String,
        /// Version whose index to query.
        version: String,
        /// Whether to send the full thread transcript rather than just the question.
        full_thread: bool,
    },
    /// Add thread content to a project/version index.
    Inject {
        /// Project name whose index to add to.
        project: String,
        /// Version whose index to add to.
        version: String,
    },
    /// Expand on the last message, no index involved.
    Elaborate,
    /// Unrecognized keyword (or none at all).
    Unknown,
}

impl Command {
    /// Parse mention text into a command.
    ///
    /// The text is split on whitespace; the token after the mention marker is
    /// the keyword, and the remaining tokens are positional arguments (extras
    /// are ignored). A recognized keyword with missing arguments yields
    /// `Err` carrying the command-specific usage hint to post; the
    /// orchestrator must not be invoked in that case.
    pub fn parse(text: &str) -> Result<Self, &'static str> {
        let tokens: Vec<&str> = text.split_whitespace().collect();

        let command = match (tokens.get(1).copied(), tokens.get(2), tokens.get(3)) {
            (Some("answer"), Some(project), Some(version)) => Command::Answer {
                project: project.to_string(),
                version: version.to_string(),
                full_thread: false,
            },
            (Some("answer-all"), Some(project), Some(version)) => Command::Answer {
                project: project.to_string(),
                version: version.to_string(),
                full_thread: true,
            },
            (Some("answer") | Some("answer-all"), _, _) => return Err(ANSWER_USAGE),
            (Some("inject"), Some(project), Some(version)) => Command::Inject {
                project: project.to_string(),
                version: version.to_string(),
            },
            (Some("inject"), _, _) => return Err(INJECT_USAGE),
            (Some("elaborate"), _, _) => Command::Elaborate,
            _ => Command::Unknown,
        };

        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_answer_with_project_and_version() {
        let command = Command::parse("<@UBOT> answer sriov 4.16").unwrap();

        assert_eq!(
            command,
            Command::Answer {
                project: "sriov".into(),
                version: "4.16".into(),
                full_thread: false,
            }
        );
    }

    #[test]
    fn parses_answer_all_with_full_thread() {
        let command = Command::parse("<@UBOT> answer-all metallb 4.18").unwrap();

        assert_eq!(
            command,
            Command::Answer {
                project: "metallb".into(),
                version: "4.18".into(),
                full_thread: true,
            }
        );
    }

    #[test]
    fn parses_inject() {
        let command = Command::parse("<@UBOT> inject sriov 4.16").unwrap();

        assert_eq!(
            command,
            Command::Inject {
                project: "sriov".into(),
                version: "4.16".into(),
            }
        );
    }

    #[test]
    fn parses_elaborate_without_arguments() {
        assert_eq!(Command::parse("<@UBOT> elaborate").unwrap(), Command::Elaborate);
    }

    #[test]
    fn missing_arguments_yield_the_usage_hint() {
        assert_eq!(Command::parse("<@UBOT> answer sriov"), Err(ANSWER_USAGE));
        assert_eq!(Command::parse("<@UBOT> answer"), Err(ANSWER_USAGE));
        assert_eq!(Command::parse("<@UBOT> answer-all"), Err(ANSWER_USAGE));
        assert_eq!(Command::parse("<@UBOT> inject sriov"), Err(INJECT_USAGE));
    }

    #[test]
    fn unknown_keyword_maps_to_unknown() {
        assert_eq!(Command::parse("<@UBOT> bogus").unwrap(), Command::Unknown);
        assert_eq!(Command::parse("<@UBOT>").unwrap(), Command::Unknown);
        assert_eq!(Command::parse("").unwrap(), Command::Unknown);
    }

    #[test]
    fn extra_tokens_are_ignored() {
        let command = Command::parse("<@UBOT> answer sriov 4.16 please and thanks").unwrap();

        assert_eq!(
            command,
            Command::Answer {
                project: "sriov".into(),
                version: "4.16".into(),
                full_thread: false,
            }
        );
    }
}

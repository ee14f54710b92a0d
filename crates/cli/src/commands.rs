#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Examples,
    Stats,
    Verbose,
    Clear,
    Quit,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Command(Command),
    Question(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Question(line.to_string());
        }

        let command = match line.to_lowercase().as_str() {
            "/help" => Command::Help,
            "/examples" => Command::Examples,
            "/stats" => Command::Stats,
            "/verbose" => Command::Verbose,
            "/clear" => Command::Clear,
            "/quit" | "/exit" | "/q" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        };
        Self::Command(command)
    }
}

pub const HELP: &str = "\
Commands:
  /help      Show this help
  /examples  Show example questions
  /stats     Show knowledge graph statistics
  /verbose   Toggle query and retrieval details
  /clear     Clear the screen
  /quit      Exit (also /exit, /q)

Anything else is asked as a question.";

pub const EXAMPLES: &[&str] = &[
    "What is the elixir cost of the Giant?",
    "Which cards counter P.E.K.K.A?",
    "What cards synergize well with Hog Rider?",
    "Show me all legendary cards",
    "What are the cheapest spells?",
    "Which cards can target air units?",
    "Analyze my deck: Hog Rider, Musketeer, Ice Spirit, Skeletons, Cannon, Fireball, The Log, Ice Golem",
];

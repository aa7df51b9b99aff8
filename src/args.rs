use clap::Parser;

/// This is a survey tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON request describing the workbook, the filters and the questions to tabulate.
    /// For more information about the file format, read the documentation of the survey_tabs crate (manual module).
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path or empty) The Excel workbook holding the responses. Setting this option overrides the path
    /// that may be specified with the --config option. Without a configuration, every classified question is
    /// tabulated with its first recommended type.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (sheet name, optional) The worksheet holding the responses. By default, the only worksheet that is
    /// neither the answer key nor the variable information.
    #[clap(short, long, value_parser)]
    pub sheet: Option<String>,

    /// (legacy or modern, optional) The layout of the workbook. Detected from the sheet names by default.
    #[clap(long, value_parser)]
    pub convention: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to the given
    /// location. Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, survtab will check that the tabulated
    /// output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed as an argument, only prints the recommended types of every question.
    #[clap(long, takes_value = false)]
    pub classify: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

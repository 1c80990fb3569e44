use clap::Parser;

/// This program generates personnel ordinances from Word templates.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (gq, remocao, vacancia or gsiste) The family of the ordinances to generate.
    #[clap(short, long, value_parser)]
    pub kind: String,

    /// (KEY=VALUE, repeated) The fields of the form. When a spreadsheet is given, these fields
    /// apply to every row and take precedence over its cells.
    #[clap(short, long, value_parser)]
    pub field: Vec<String>,

    /// (file path, optional) A spreadsheet (.xlsx or .csv) with one ordinance per row. If not
    /// provided, a single ordinance is generated from the fields.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file name, optional) The name of the archive produced from a spreadsheet. Defaults to
    /// portarias_<kind>.zip.
    #[clap(long, value_parser)]
    pub archive_name: Option<String>,

    /// (file path, optional) A JSON file with the locations of the templates.
    /// For more information about the file format, read the manual of the `portarias` crate.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, optional) The directory holding the templates. Setting this option overrides
    /// the directory that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub template_dir: Option<String>,

    /// (directory, default .) Where the generated document or archive is written.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

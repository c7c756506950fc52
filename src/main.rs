use clap::Parser;
use color_print::cprintln;
use std::process::ExitCode;

use polyasm::{assemble, Config, Diagnostics, FieldWidths, Line, ParamFormat, SectionOffsets};

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(
    name = "polyasm",
    version,
    about = "Assembler for a customizable 32-bit custom-designed processor",
    help_template = HELP_TEMPLATE
)]
struct Args {
    /// Input assembly file
    #[clap(short = 'i', long = "input")]
    input: String,

    /// Output bitstring text file
    #[clap(short = 'o', long = "output")]
    output: String,

    /// Section offsets, e.g. code=0,data=0x50
    #[clap(
        short = 'm',
        long = "memory-offset",
        default_value = "code=0,data=0x50",
        value_parser = SectionOffsets::parse
    )]
    offsets: SectionOffsets,

    /// Field widths; must sum to 30, e.g. opcode=5,param1=14,param2=5,param3=6
    #[clap(
        short = 'w',
        long = "field-width",
        default_value = "opcode=5,param1=14,param2=5,param3=6",
        value_parser = FieldWidths::parse
    )]
    widths: FieldWidths,

    /// Also emit <output>_readable.txt
    #[clap(short = 'r', long = "readable")]
    readable: bool,

    /// Also emit <output>.log
    #[clap(short = 'l', long = "log")]
    log: bool,

    /// Verbose diagnostics
    #[clap(short = 'v', long = "verbose")]
    verbose: bool,

    /// Dump symbol tables
    #[clap(short = 'd', long = "debug")]
    debug: bool,

    /// Parameter display base in the readable file
    #[clap(short = 'f', long = "param-format", value_enum, default_value = "hex")]
    format: Format,

    /// Accepted for compatibility; the output is textual, so byte order
    /// never applies
    #[clap(short = 'e', long = "endianness", value_enum, default_value = "big")]
    endianness: Endian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Format {
    Hex,
    Dec,
    Bin,
}

impl Format {
    fn to_param_format(self) -> ParamFormat {
        match self {
            Format::Hex => ParamFormat::Hex,
            Format::Dec => ParamFormat::Dec,
            Format::Bin => ParamFormat::Bin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Endian {
    Big,
    Little,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _ = args.endianness;

    let config = Config {
        offsets: args.offsets,
        widths: args.widths,
    };
    let mut diags = Diagnostics::new();

    // Bad field widths are fatal before parsing even starts.
    if let Err(err) = config.widths.validate() {
        diags.report_global(err);
        diags.print(&args.input, &[]);
        return ExitCode::from(1);
    }

    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            cprintln!(
                "<red,bold>error</>: cannot read input file `{}`: {}",
                args.input,
                err
            );
            return ExitCode::from(1);
        }
    };

    if args.verbose {
        println!("1. Scan & Parse");
        println!("  < {}", args.input);
    }
    let lines = Line::scan(&source);
    let asm = assemble(&lines, &config, &mut diags);
    if args.verbose {
        println!(
            "  - {} blocks, {} macros",
            asm.program.blocks.len(),
            asm.symbols.macros.len()
        );
        println!("2. Layout & Resolve");
        println!(
            "  - {} functions, {} memory blocks, {} aliases",
            asm.symbols.functions.len(),
            asm.symbols.memories.len(),
            asm.symbols.aliases.len()
        );
        println!("  - fixed point after {} pass(es)", asm.passes);
        println!("3. Encode & Emit");
        println!("  - {} words", asm.records.len());
    }

    if args.debug {
        println!("=== Symbol Tables ===");
        print!("{}", asm.symbols.to_yaml());
    }

    diags.print(&args.input, &lines);

    if args.log {
        let log_path = format!("{}.log", args.output);
        if let Err(err) = std::fs::write(&log_path, diags.to_log()) {
            cprintln!("<red,bold>error</>: cannot write `{}`: {}", log_path, err);
            return ExitCode::from(1);
        }
        if args.verbose {
            println!("  > {}", log_path);
        }
    }

    if diags.has_errors() {
        cprintln!(
            "<red,bold>assembly failed</>: {} error(s)",
            diags.error_count()
        );
        return ExitCode::from(1);
    }

    if let Err(err) = std::fs::write(&args.output, polyasm::bitstring(&asm.records)) {
        cprintln!("<red,bold>error</>: cannot write `{}`: {}", args.output, err);
        return ExitCode::from(1);
    }

    let mut readable_path = None;
    if args.readable {
        let path = format!("{}_readable.txt", args.output);
        let report = polyasm::readable(
            &asm.records,
            &config.widths,
            args.format.to_param_format(),
        );
        if let Err(err) = std::fs::write(&path, report) {
            cprintln!("<red,bold>error</>: cannot write `{}`: {}", path, err);
            return ExitCode::from(1);
        }
        readable_path = Some(path);
    }

    summary(&args, &config, &asm, readable_path.as_deref());
    ExitCode::SUCCESS
}

fn summary(args: &Args, config: &Config, asm: &polyasm::Assembly, readable: Option<&str>) {
    let code_size = asm.symbols.code_size();
    let data_size = asm.symbols.data_size();
    cprintln!("<green,bold>assembly complete</>");
    if code_size > 0 {
        cprintln!(
            "  code section: <blue>0x{:X} - 0x{:X}</> ({} words)",
            config.offsets.code,
            config.offsets.code + code_size - 1,
            code_size
        );
    }
    if data_size > 0 {
        cprintln!(
            "  data section: <blue>0x{:X} - 0x{:X}</> ({} words)",
            config.offsets.data,
            config.offsets.data + data_size - 1,
            data_size
        );
    }
    cprintln!("  bitstring:    <magenta>{}</>", args.output);
    if let Some(path) = readable {
        cprintln!("  readable:     <magenta>{}</>", path);
    }
}

// crates/pw_cli/src/wizard.rs
//
// Minimal interactive front door: collect parameter lines on stdin, build
// the model, and hand off to the normal generate flow with defaults.
// Prompts live on the diagnostic stream so the emitted table stays alone
// on stdout.

use std::io::{self, BufRead};

use pw_pipeline::RunOptions;
use pw_report::OutputFormat;

use crate::args::WizardArgs;
use crate::{execute_generate, resolve_generator, EXIT_INPUT};
use pw_io::{parse_model_str, PictRunner};

pub fn run(a: WizardArgs) -> u8 {
    eprintln!("pw: wizard: enter parameters as NAME: v1, v2, ... (empty line to finish)");

    let mut source = String::new();
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("pw: error: cannot read stdin: {e}");
                return EXIT_INPUT;
            }
        };
        if line.trim().is_empty() {
            break;
        }
        source.push_str(&line);
        source.push('\n');
    }

    let model = match parse_model_str(&source) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("pw: error: {e}");
            return EXIT_INPUT;
        }
    };
    eprintln!(
        "pw: wizard: {} parameter(s); generating with default settings",
        model.param_count()
    );

    let bin = match resolve_generator(a.pict_bin.as_deref()) {
        Ok(b) => b,
        Err(msg) => {
            eprintln!("pw: error: {msg}");
            return EXIT_INPUT;
        }
    };

    execute_generate(
        &model,
        &RunOptions::default(),
        &PictRunner::new(bin),
        OutputFormat::Table,
        None,
        false,
    )
}

use clap::{CommandFactory, ValueEnum};
use std::fs::File;
use std::io::Write;

include!("src/cli.rs");

fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=src/cli.rs");

    let outdir = std::path::PathBuf::from("gen/");

    std::fs::create_dir_all(&outdir)?;

    let mut cmd = Cli::command();
    let cmd_name = cmd.get_name().to_string();

    for &shell in clap_complete::Shell::value_variants() {
        clap_complete::generate_to(shell, &mut cmd, &cmd_name, &outdir)?;
    }

    let mut buffer: Vec<u8> = Default::default();
    let man = clap_mangen::Man::new(cmd.clone());
    man.render(&mut buffer)?;
    std::fs::write(outdir.join(format!("{cmd_name}.1")), &buffer)?;

    for subcmd in cmd.get_subcommands() {
        buffer.clear();
        let man = clap_mangen::Man::new(subcmd.clone());
        man.render(&mut buffer)?;
        let subcmd_name = subcmd.get_name();
        std::fs::write(outdir.join(format!("{cmd_name}-{subcmd_name}.1")), &buffer)?;
    }

    let usage = cmd.render_long_help();
    let mut readme = File::create("README.md")?;
    write!(readme, "# {cmd_name}\n```text\n{usage}```")?;

    Ok(())
}

use clap::CommandFactory;
use std::path::Path;

#[path = "src/cli.rs"]
mod cli;

/// Man pages for `pdfstitch` and each of its tasks, written to `OUT_DIR`.
fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    let out_dir = std::env::var_os("OUT_DIR").ok_or(std::io::ErrorKind::NotFound)?;
    let out_dir = Path::new(&out_dir);

    let cmd = cli::Cli::command();
    for task in cmd.get_subcommands().filter(|task| !task.is_hide_set()) {
        let page_name = format!("{}-{}", cmd.get_name(), task.get_name());
        let task = task.clone().name(page_name.clone());
        write_man_page(task, &out_dir.join(format!("{page_name}.1")))?;
    }
    write_man_page(cmd, &out_dir.join("pdfstitch.1"))
}

fn write_man_page(cmd: clap::Command, path: &Path) -> std::io::Result<()> {
    let mut page = Vec::new();
    clap_mangen::Man::new(cmd).render(&mut page)?;
    std::fs::write(path, page)
}

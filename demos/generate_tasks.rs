use std::path::PathBuf;

use dotlink::{ConnectionMode, TaskAssembler, TaskConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let out_dir = PathBuf::from("out/dot_to_dot");

    for mode in ConnectionMode::ALL {
        let mut cfg = TaskConfig {
            connection: mode,
            num_dots: 7,
            seed: Some(7),
            ..TaskConfig::default()
        };
        cfg.video.dir = Some(out_dir.join("videos"));
        cfg.domain = format!("dot_to_dot_{mode}");

        let mut assembler = TaskAssembler::with_default_font(cfg)?;
        for task in assembler.generate_batch(2)? {
            let dir = out_dir.join(task.id());
            task.initial_frame().save_png(&dir.join("first_frame.png"))?;
            task.final_frame().save_png(&dir.join("final_frame.png"))?;
            std::fs::write(dir.join("prompt.txt"), task.prompt())?;

            match task.video() {
                Some(v) => println!("{}: {} ({})", task.id(), dir.display(), v.display()),
                None => println!("{}: {} (no video)", task.id(), dir.display()),
            }
        }
    }

    Ok(())
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Copy reference images and config next to the executable
    copy_templates();
    copy_config();
}

/// target/debug or target/release.
fn target_dir() -> PathBuf {
    let out_dir = env::var("OUT_DIR").unwrap();
    // OUT_DIR is target/<profile>/build/video-automation-xxx/out
    Path::new(&out_dir)
        .ancestors()
        .nth(3)
        .expect("Could not find target directory")
        .to_path_buf()
}

/// Copies the template folder so the executable can find reference images.
fn copy_templates() {
    let template_src = Path::new("resources/template");
    let template_dst = target_dir().join("resources").join("template");

    if template_src.exists() {
        copy_dir_recursive(template_src, &template_dst);
        println!("cargo:rerun-if-changed=resources/template/");
    }
}

/// Recursively copies a directory and its contents.
fn copy_dir_recursive(src: &Path, dst: &Path) {
    let _ = fs::create_dir_all(dst);

    if let Ok(entries) = fs::read_dir(src) {
        for entry in entries.flatten() {
            let src_path = entry.path();
            let dst_path = dst.join(entry.file_name());

            if src_path.is_dir() {
                copy_dir_recursive(&src_path, &dst_path);
            } else {
                let _ = fs::copy(&src_path, &dst_path);
            }
        }
    }
}

/// Copies config.json to the target directory.
fn copy_config() {
    let config_src = Path::new("config.json");
    let config_dst = target_dir().join("config.json");

    if config_src.exists() {
        let _ = fs::copy(config_src, &config_dst);
        println!("cargo:rerun-if-changed=config.json");
    }
}

fn main() {
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "espidf" {
        embuild::espidf::sysenv::output();
    }

    if std::env::var("CARGO_FEATURE_TFLITE_MICRO").is_ok() {
        // ESP32-S3 is Xtensa; the g++ lives under the Embuild toolchain directory:
        // .embuild/espressif/tools/xtensa-esp-elf/esp-<VER>/xtensa-esp-elf/bin/xtensa-esp32s3-elf-g++
        let compiler = find_compiler().unwrap_or_else(|| "xtensa-esp32s3-elf-g++".into());
        build_model(&compiler);
    }
}

fn find_compiler() -> Option<std::path::PathBuf> {
    use std::path::PathBuf;
    // Check local .embuild first, then global ~/.espressif
    let search_dirs = vec![
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").ok()?).join(".embuild"),
        dirs::home_dir().map(|h| h.join(".espressif")).unwrap_or_default(),
    ];

    for root in search_dirs {
        let tools_dir = root.join("espressif/tools/xtensa-esp-elf");
        let Ok(entries) = std::fs::read_dir(&tools_dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let candidate = entry
                .path()
                .join("xtensa-esp-elf/bin/xtensa-esp32s3-elf-g++");
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }
    None
}

/// Compile the exported fall-detection model together with the TFLM shim
/// that exposes `fd_model_init` / `fd_model_invoke`.
fn build_model(compiler_path: &std::path::Path) {
    use std::path::PathBuf;

    let model_root = PathBuf::from("fall-detection_inferencing");

    let mut build = cc::Build::new();
    build
        .cpp(true)
        .compiler(compiler_path)
        .flag("-std=c++17")
        .flag("-O3")
        .define("TF_LITE_STATIC_MEMORY", None)
        .include(&model_root)
        .include(model_root.join("third_party/flatbuffers/include"))
        .include(model_root.join("third_party/gemmlowp"));

    add_source_files(&mut build, &model_root);

    build.compile("fall-detection-model");

    println!("cargo:rerun-if-changed=fall-detection_inferencing");
}

fn add_source_files(build: &mut cc::Build, dir: &std::path::Path) {
    for entry in std::fs::read_dir(dir).expect("Failed to read directory") {
        let entry = entry.expect("Failed to read directory entry");
        let path = entry.path();

        if path.is_dir() {
            add_source_files(build, &path);
        } else if let Some(ext) = path.extension() {
            if ext == "c" || ext == "cpp" || ext == "cc" {
                build.file(&path);
            }
        }
    }
}

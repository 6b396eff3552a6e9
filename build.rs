fn main() {
    // This build script tells cargo where to find the Knitro library when the
    // `link` feature is enabled. Without it the solver is opened at runtime
    // through `load_library`, and nothing needs to be linked here.
    println!("cargo:rerun-if-env-changed=KNITRODIR");
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var_os("CARGO_FEATURE_LINK").is_none() {
        return;
    }

    // Knitro installs ship a `lib/` directory under KNITRODIR rather than a
    // pkg-config file, so prefer the environment variable when it is set.
    if let Some(dir) = std::env::var_os("KNITRODIR") {
        let lib_dir = std::path::Path::new(&dir).join("lib");
        println!("cargo:rustc-link-search=native={}", lib_dir.display());
        return;
    }

    if let Err(e) = pkg_config::Config::new().cargo_metadata(true).probe("knitro") {
        println!("cargo:warning=KNITRODIR is not set and pkg-config could not find knitro: {e}");
    }
}

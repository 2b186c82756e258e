fn main() {
    println!("cargo:rerun-if-env-changed=RELEASE_VERSION");

    // CI stamps RELEASE_VERSION; local builds use the manifest version,
    // marked -dev when built without optimizations.
    let app_version = match std::env::var("RELEASE_VERSION") {
        Ok(release) => release,
        Err(_) => {
            let pkg = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into());
            match std::env::var("PROFILE").as_deref() {
                Ok("debug") => format!("{pkg}-dev"),
                _ => pkg,
            }
        }
    };

    println!("cargo:rustc-env=APP_VERSION={app_version}");
}

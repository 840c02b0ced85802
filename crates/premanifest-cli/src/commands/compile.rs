use super::{json_pretty, Context, EXIT_SUCCESS};
use std::path::{Path, PathBuf};

/// `<CONF>.manifest.sgx` next to the descriptor.
pub fn default_output(conf: &Path) -> PathBuf {
    let mut name = conf.as_os_str().to_owned();
    name.push(".manifest.sgx");
    PathBuf::from(name)
}

pub fn run(ctx: &Context, conf: &Path, output: Option<&Path>) -> Result<u8, String> {
    let output = output.map_or_else(|| default_output(conf), Path::to_path_buf);
    let builder = ctx.builder()?;
    let result = builder
        .compile(conf, &output)
        .map_err(|e| e.to_string())?;

    if ctx.json {
        println!("{}", json_pretty(&result)?);
    } else {
        println!("wrote {}", result.output.display());
        println!("entries: {}", result.entries);
        println!("digest: {}", result.digest);
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_appends_suffix() {
        assert_eq!(
            default_output(Path::new("apps/redis.conf")),
            PathBuf::from("apps/redis.conf.manifest.sgx")
        );
    }
}

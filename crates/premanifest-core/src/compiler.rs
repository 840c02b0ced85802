use crate::assemble::{entry, Manifest};
use crate::config::CompilerConfig;
use crate::postprocess::Postprocessor;
use crate::trust::{DependencyResolver, TrustSet};
use crate::CoreError;
use premanifest_schema::{
    check_timeserver_url, manifest_key, parse_descriptor_file, Descriptor, DirectiveKind,
    DirectiveLine, FsType, MountAccess, Uri,
};
use premanifest_tools::Toolchain;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Upper bound on the hex-encoded CA certificate the loader can hold.
pub const CA_DER_HEX_MAX: usize = 4096;

/// Fixed-point scale of the time-server sampling rate (four decimal digits).
pub const RATE_SCALE: f64 = 10_000.0;

/// State accumulated while directives are consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compilation {
    pub out: Vec<String>,
    pub trust: TrustSet,
    pub ro_roots: Vec<Uri>,
    pub rw_roots: Vec<Uri>,
}

type Handler<'a> = fn(&mut DirectiveCompiler<'a>, &DirectiveLine) -> Result<(), CoreError>;

fn handler<'a>(kind: DirectiveKind) -> Handler<'a> {
    match kind {
        DirectiveKind::Mount => DirectiveCompiler::mount,
        DirectiveKind::Debug => DirectiveCompiler::debug,
        DirectiveKind::Exec => DirectiveCompiler::exec,
        DirectiveKind::Module => DirectiveCompiler::module,
        DirectiveKind::Bind => DirectiveCompiler::bind,
        DirectiveKind::EnclaveSize => DirectiveCompiler::enclave_size,
        DirectiveKind::Threads => DirectiveCompiler::threads,
        DirectiveKind::TimeServer => DirectiveCompiler::timeserver,
        DirectiveKind::CaFile => DirectiveCompiler::cafile,
    }
}

/// Runs each descriptor directive through its handler, in source order.
pub struct DirectiveCompiler<'a> {
    config: &'a CompilerConfig,
    tools: &'a Toolchain,
    state: Compilation,
}

impl<'a> DirectiveCompiler<'a> {
    pub fn new(config: &'a CompilerConfig, tools: &'a Toolchain) -> Self {
        Self {
            config,
            tools,
            state: Compilation::default(),
        }
    }

    pub fn compile(mut self, descriptor: &Descriptor) -> Result<Compilation, CoreError> {
        for line in &descriptor.directives {
            debug!(
                "{}:{} {} {}",
                line.location.file,
                line.location.line,
                line.kind,
                line.args.join(" ")
            );
            handler(line.kind)(&mut self, line)?;
        }
        Ok(self.state)
    }

    fn emit(&mut self, key: &str, value: impl std::fmt::Display) {
        self.state.out.push(entry(key, value));
    }

    fn mount(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        let [host, guest, fstype, options @ ..] = d.args.as_slice() else {
            return Err(arity(d));
        };
        let uri = Uri::parse(host).map_err(|e| parse_err(d, e))?;
        let fstype = FsType::parse(fstype).map_err(|e| parse_err(d, e))?;

        let name = manifest_key(guest);
        self.emit(&format!("fs.mount.{name}.type"), fstype);
        self.emit(&format!("fs.mount.{name}.path"), guest);
        self.emit(&format!("fs.mount.{name}.uri"), &uri);

        if fstype == FsType::Chroot {
            let root = uri.file_path().map_err(|e| parse_err(d, e))?;
            let root = Uri::from_path(&self.config.absolute(root));
            match MountAccess::from_options(options).map_err(|e| parse_err(d, e))? {
                MountAccess::ReadOnly => self.state.ro_roots.push(root),
                MountAccess::ReadWrite => self.state.rw_roots.push(root),
            }
        } else if !options.is_empty() {
            debug!("{fstype} mount {guest}: ignoring options {options:?}");
        }
        Ok(())
    }

    fn debug(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        match d.args[0].as_str() {
            "on" => self.emit("loader.debug_type", "inline"),
            "off" => self.emit("loader.debug_type", "none"),
            other => {
                return Err(parse_err(
                    d,
                    format!("DEBUG must be \"on\" or \"off\", not \"{other}\""),
                ))
            }
        }
        Ok(())
    }

    fn exec(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        let path = self.file_arg(d, &d.args[0])?;
        let execname = file_name(d, &path)?;
        self.emit("loader.exec", Uri::from_path(&path));
        self.emit("loader.execname", execname);
        DependencyResolver::new(self.tools).resolve(&path, &mut self.state.trust)?;
        Ok(())
    }

    fn module(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        let path = self.file_arg(d, &d.args[0])?;
        let name = file_name(d, &path)?;
        if !self.state.trust.insert(name.clone(), path.clone()) {
            debug!("module '{name}' already trusted");
        }
        DependencyResolver::new(self.tools).resolve(&path, &mut self.state.trust)?;
        Ok(())
    }

    fn bind(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        let [ip, port] = d.args.as_slice() else {
            return Err(arity(d));
        };
        let port: u16 = parse_int(d, port)?;
        let addr = format!("{ip}:{port}");
        self.emit(&format!("net.allow_bind.{}", manifest_key(&addr)), addr);
        Ok(())
    }

    fn enclave_size(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        let mb: u64 = parse_int(d, &d.args[0])?;
        self.emit("sgx.enclave_size", format!("{mb}M"));
        Ok(())
    }

    fn threads(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        let [num, options @ ..] = d.args.as_slice() else {
            return Err(arity(d));
        };
        let n: u32 = parse_int(d, num)?;
        self.emit("sgx.thread_num", n);
        match options {
            [] => {}
            [opt] if opt == "exitless" => self.emit("sgx.rpc_thread_num", n),
            [opt] => {
                return Err(parse_err(d, format!("THREADS: invalid option \"{opt}\"")));
            }
            many => {
                return Err(parse_err(
                    d,
                    format!("THREADS: invalid options \"{}\"", many.join(" ")),
                ));
            }
        }
        Ok(())
    }

    fn timeserver(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        let [url, pubkey, rate] = d.args.as_slice() else {
            return Err(arity(d));
        };
        check_timeserver_url(url).map_err(|e| parse_err(d, e))?;
        let rate = parse_rate(d, rate)?;
        let key = self
            .tools
            .dump_rsa_public_key(&self.config.absolute(Path::new(pubkey)))?;

        self.emit("timeserver.url", url);
        self.emit("timeserver.rsa_n", key.modulus_hex());
        self.emit("timeserver.rsa_e", key.exponent_hex());
        self.emit("timeserver.rate", rate);
        Ok(())
    }

    fn cafile(&mut self, d: &DirectiveLine) -> Result<(), CoreError> {
        let pem = &d.args[0];
        let der = self
            .tools
            .cert_pem_to_der(&self.config.absolute(Path::new(pem)))?;
        let der_hex = hex::encode(der);
        if der_hex.len() > CA_DER_HEX_MAX {
            return Err(parse_err(
                d,
                format!(
                    "cafile \"{pem}\": conversion to der hex is too big ({} > {CA_DER_HEX_MAX})",
                    der_hex.len()
                ),
            ));
        }
        self.emit("phoenix.ca_der", der_hex);
        Ok(())
    }

    /// Absolute host path of a `file:` URI argument.
    fn file_arg(&self, d: &DirectiveLine, raw: &str) -> Result<PathBuf, CoreError> {
        let uri = Uri::parse_file(raw).map_err(|e| parse_err(d, e))?;
        let path = uri.file_path().map_err(|e| parse_err(d, e))?;
        Ok(self.config.absolute(path))
    }
}

fn parse_err(d: &DirectiveLine, msg: impl ToString) -> CoreError {
    CoreError::Parse(d.location.error(msg.to_string()))
}

fn arity(d: &DirectiveLine) -> CoreError {
    let msg = d
        .kind
        .arity_mismatch(d.args.len())
        .unwrap_or_else(|| format!("directive \"{}\": malformed arguments", d.kind));
    CoreError::Parse(d.location.error(msg))
}

fn parse_int<T: FromStr>(d: &DirectiveLine, s: &str) -> Result<T, CoreError> {
    s.parse::<T>()
        .map_err(|_| parse_err(d, format!("expected an integer value but got \"{s}\"")))
}

/// Parse a sampling rate in `[0, 1]` into fixed-point units.
fn parse_rate(d: &DirectiveLine, s: &str) -> Result<u32, CoreError> {
    let r: f64 = s
        .parse()
        .map_err(|_| parse_err(d, format!("expected a float value but got \"{s}\"")))?;
    if !(0.0..=1.0).contains(&r) {
        return Err(parse_err(
            d,
            format!("TIMESERVER: invalid rate: {s}; must be >= 0 and <= 1"),
        ));
    }
    Ok((r * RATE_SCALE) as u32)
}

fn file_name(d: &DirectiveLine, path: &Path) -> Result<String, CoreError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| parse_err(d, format!("no file name in \"{}\"", path.display())))
}

/// Compile a parsed descriptor into a manifest.
pub fn compile_descriptor(
    descriptor: &Descriptor,
    config: &CompilerConfig,
    tools: &Toolchain,
) -> Result<Manifest, CoreError> {
    let compilation = DirectiveCompiler::new(config, tools).compile(descriptor)?;
    let entries = Postprocessor::new(&config.layout).run(compilation)?;
    Ok(Manifest::new(config.layout.shebang(), entries))
}

pub fn compile_file(
    path: &Path,
    config: &CompilerConfig,
    tools: &Toolchain,
) -> Result<Manifest, CoreError> {
    let descriptor = parse_descriptor_file(path)?;
    compile_descriptor(&descriptor, config, tools)
}

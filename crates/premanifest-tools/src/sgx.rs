use crate::runner::{Invocation, ToolRunner};
use crate::ToolError;
use std::path::PathBuf;

/// Inputs and output of an enclave signing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub manifest: PathBuf,
    pub key: PathBuf,
    pub libpal: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub signature: PathBuf,
    pub output: PathBuf,
}

/// Sign a manifest. The signer writes `output` and `<output>.sig`.
pub fn sign_manifest(
    runner: &dyn ToolRunner,
    signer: &str,
    request: &SignRequest,
) -> Result<(), ToolError> {
    let invocation = Invocation::new(signer)
        .arg("-output")
        .arg_path(&request.output)
        .arg("-key")
        .arg_path(&request.key)
        .arg("-libpal")
        .arg_path(&request.libpal)
        .arg("-manifest")
        .arg_path(&request.manifest);
    runner.run(&invocation)?;
    Ok(())
}

/// Fetch a launch token for a signature.
pub fn get_token(
    runner: &dyn ToolRunner,
    token_tool: &str,
    request: &TokenRequest,
) -> Result<(), ToolError> {
    let invocation = Invocation::new(token_tool)
        .arg("-output")
        .arg_path(&request.output)
        .arg("-sig")
        .arg_path(&request.signature);
    runner.run(&invocation)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockRunner;

    #[test]
    fn signer_arguments() {
        let runner = MockRunner::new().with_output(
            "pal-sgx-sign -output out/manifest.sgx -key k.pem -libpal /g/Runtime/libpal-Linux-SGX.so -manifest out/manifest",
            "",
        );
        let req = SignRequest {
            manifest: PathBuf::from("out/manifest"),
            key: PathBuf::from("k.pem"),
            libpal: PathBuf::from("/g/Runtime/libpal-Linux-SGX.so"),
            output: PathBuf::from("out/manifest.sgx"),
        };
        sign_manifest(&runner, "pal-sgx-sign", &req).unwrap();
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn token_failure_propagates() {
        let runner = MockRunner::new().with_failure(
            "pal-sgx-get-token -output t -sig s",
            1,
        );
        let req = TokenRequest {
            signature: PathBuf::from("s"),
            output: PathBuf::from("t"),
        };
        let err = get_token(&runner, "pal-sgx-get-token", &req).unwrap_err();
        assert!(err.to_string().contains("returned 1"), "{err}");
    }
}

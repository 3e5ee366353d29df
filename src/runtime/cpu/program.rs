//! CPU program build and kernel objects
//!
//! Building checks the OpenCL source the way a front end would before
//! linking: delimiters must balance and every `__kernel` entry point must
//! resolve to a native host kernel. Diagnostics use the familiar
//! `<source>:line:col: error: ...` form.

use std::sync::Arc;

use super::kernels::{self, ArgValue, HostKernel, ParamKind};
use super::{CpuBuffer, CpuContext};
use crate::error::{Error, Result};
use crate::kernel::LaunchConfig;
use crate::runtime::{ComputeContext, ContextId, DeviceBuffer, KernelArg, KernelObject};

const KERNEL_QUALIFIER: &str = "__kernel void ";

/// A built host program
#[derive(Debug)]
pub struct CpuProgram {
    context: ContextId,
    source: String,
    kernels: Vec<HostKernel>,
}

impl CpuProgram {
    pub(crate) fn build(context: &CpuContext, source: &str) -> Result<Self> {
        check_delimiters(source)?;

        let mut kernels = Vec::new();
        for (name, line, col) in kernel_declarations(source) {
            let kernel = kernels::lookup(name).ok_or_else(|| {
                Error::build_failure(format!(
                    "<source>:{}:{}: error: no host implementation for kernel '{}'",
                    line, col, name
                ))
            })?;
            kernels.push(kernel);
        }

        if kernels.is_empty() {
            return Err(Error::build_failure(
                "<source>: error: source declares no __kernel entry points",
            ));
        }

        tracing::debug!(
            context = %context.id(),
            kernels = kernels.len(),
            "built cpu program"
        );

        Ok(Self {
            context: context.id(),
            source: source.to_string(),
            kernels,
        })
    }

    /// Context the program was built for
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    /// The source text the program was built from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names of the entry points in this program
    pub fn kernel_names(&self) -> impl Iterator<Item = &str> {
        self.kernels.iter().map(|k| k.name)
    }
}

/// Find `__kernel void name(` declarations with 1-based line/column
fn kernel_declarations(source: &str) -> Vec<(&str, usize, usize)> {
    let mut found = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        let mut rest = line;
        let mut col = 0;
        while let Some(pos) = rest.find(KERNEL_QUALIFIER) {
            let after = &rest[pos + KERNEL_QUALIFIER.len()..];
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let name_col = col + pos + KERNEL_QUALIFIER.len();
            found.push((&after[..name_len], line_no + 1, name_col + 1));
            col = name_col + name_len;
            rest = &after[name_len..];
        }
    }
    found
}

/// Check that braces, brackets and parentheses balance
fn check_delimiters(source: &str) -> Result<()> {
    let mut stack: Vec<(char, usize, usize)> = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        for (col, c) in line.chars().enumerate() {
            let open = match c {
                '{' | '(' | '[' => {
                    stack.push((c, line_no + 1, col + 1));
                    continue;
                }
                '}' => '{',
                ')' => '(',
                ']' => '[',
                _ => continue,
            };
            match stack.pop() {
                Some((o, _, _)) if o == open => {}
                _ => {
                    return Err(Error::build_failure(format!(
                        "<source>:{}:{}: error: unexpected '{}'",
                        line_no + 1,
                        col + 1,
                        c
                    )));
                }
            }
        }
    }

    match stack.pop() {
        Some((c, line, col)) => Err(Error::build_failure(format!(
            "<source>:{}:{}: error: unmatched '{}'",
            line, col, c
        ))),
        None => Ok(()),
    }
}

// ============================================================================
// Kernel objects
// ============================================================================

/// An entry point of a [`CpuProgram`] with its bound arguments
#[derive(Debug)]
pub struct CpuKernel {
    program: Arc<CpuProgram>,
    kernel: HostKernel,
    args: Vec<Option<ArgValue>>,
}

impl CpuKernel {
    pub(crate) fn new(program: &Arc<CpuProgram>, entry_point: &str) -> Result<Self> {
        let kernel = program
            .kernels
            .iter()
            .find(|k| k.name == entry_point)
            .copied()
            .ok_or_else(|| {
                Error::Backend(format!(
                    "kernel '{}' not found in program; available: {:?}",
                    entry_point,
                    program.kernel_names().collect::<Vec<_>>()
                ))
            })?;

        Ok(Self {
            program: program.clone(),
            kernel,
            args: vec![None; kernel.params.len()],
        })
    }

    /// The program this kernel was created from
    pub fn program(&self) -> &Arc<CpuProgram> {
        &self.program
    }

    /// Snapshot the bound arguments into a runnable launch
    pub(crate) fn prepare_launch(&self, config: LaunchConfig) -> Result<CpuLaunch> {
        let args = self
            .args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                a.clone().ok_or_else(|| {
                    Error::argument(
                        "kernel",
                        format!("argument {} of '{}' is unbound", i, self.kernel.name),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CpuLaunch {
            run: self.kernel.run,
            args,
            global_size: config.global_size,
        })
    }
}

impl KernelObject for CpuKernel {
    type Buffer = CpuBuffer;

    fn entry_point(&self) -> &str {
        self.kernel.name
    }

    fn set_arg(&mut self, index: u32, arg: KernelArg<'_, CpuBuffer>) -> Result<()> {
        let kind = *self.kernel.params.get(index as usize).ok_or_else(|| {
            Error::argument(
                "index",
                format!(
                    "'{}' takes {} arguments, got index {}",
                    self.kernel.name,
                    self.kernel.params.len(),
                    index
                ),
            )
        })?;

        let value = match (kind, arg) {
            (ParamKind::Buffer, KernelArg::Buffer(b)) => {
                if b.context_id() != self.program.context {
                    return Err(Error::context_mismatch(self.program.context, b.context_id()));
                }
                ArgValue::Buffer(b.clone())
            }
            (ParamKind::U32, KernelArg::U32(v)) => ArgValue::U32(v),
            (kind, _) => {
                return Err(Error::argument(
                    "arg",
                    format!("argument {} expects {:?}", index, kind),
                ));
            }
        };

        self.args[index as usize] = Some(value);
        Ok(())
    }
}

/// A fully bound launch, ready to run on the queue worker
pub(crate) struct CpuLaunch {
    run: fn(&[ArgValue], u32),
    args: Vec<ArgValue>,
    global_size: u32,
}

impl CpuLaunch {
    pub(crate) fn run(self) {
        (self.run)(&self.args, self.global_size);
    }
}

//! EXEC statement text for a procedure call

use bakehouse_core::{ProcedureCall, ProcedureName, Result};

/// Build the `EXEC` batch for `call`. Argument `n` (1-based) binds to the
/// RPC parameter `@Pn`, in the order the call lists them.
pub(crate) fn exec_statement(call: &ProcedureCall) -> Result<String> {
    call.validate()?;

    let mut sql = format!("EXEC {}", quoted_name(call.procedure));
    for (idx, param) in call.params.iter().enumerate() {
        let sep = if idx == 0 { " " } else { ", " };
        sql.push_str(&format!("{}@{} = @P{}", sep, param.name, idx + 1));
    }
    Ok(sql)
}

/// Bracket-quote each part of a validated procedure name
pub(crate) fn quoted_name(procedure: ProcedureName) -> String {
    match procedure.parts() {
        (Some(schema), name) => format!("[{}].[{}]", schema, name),
        (None, name) => format!("[{}]", name),
    }
}

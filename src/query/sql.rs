//! Compile fault expressions into SQLite boolean conditions

use sqlx::{QueryBuilder, Sqlite};

use super::Expr;

/// Condition matching a rupture that involves a section of the named parent fault.
const FAULT_TERM_PREFIX: &str = "EXISTS (SELECT 1 FROM rupture_faults rf \
     JOIN fault f ON f.fault_id = rf.fault_id \
     JOIN parent_fault p ON p.parent_id = f.parent_id \
     WHERE rf.rupture_id = r.rupture_id AND p.name = ";

/// Append `expr` as a boolean condition over the rupture alias `r`.
///
/// Every fault name is bound as a parameter.
pub fn push_condition<'args>(builder: &mut QueryBuilder<'args, Sqlite>, expr: &Expr) {
    match expr {
        Expr::Fault(name) => {
            builder.push(FAULT_TERM_PREFIX);
            builder.push_bind(name.clone());
            builder.push(" COLLATE NOCASE)");
        }
        Expr::Not(inner) => {
            builder.push("NOT (");
            push_condition(builder, inner);
            builder.push(")");
        }
        Expr::And(lhs, rhs) => push_binary(builder, lhs, " AND ", rhs),
        Expr::Or(lhs, rhs) => push_binary(builder, lhs, " OR ", rhs),
    }
}

fn push_binary<'args>(
    builder: &mut QueryBuilder<'args, Sqlite>,
    lhs: &Expr,
    op: &str,
    rhs: &Expr,
) {
    builder.push("(");
    push_condition(builder, lhs);
    builder.push(op);
    push_condition(builder, rhs);
    builder.push(")");
}

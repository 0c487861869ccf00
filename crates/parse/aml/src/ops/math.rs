//! Integer and logical operators.

use crate::Interpreter;
use crate::context::ParseContext;
use crate::convert;
use crate::error::AmlError;
use crate::handler::Handler;
use crate::object::Object;
use crate::opcode::*;

impl<H: Handler> Interpreter<H> {
    /// `Operand Operand Target` integer operators.
    pub(super) fn eval_binary(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        op: u8,
    ) -> Result<Object, AmlError> {
        let a = self.eval_integer(ctx)?;
        let b = self.eval_integer(ctx)?;
        let target = self.parse_target(ctx)?;

        let shift = |value: u64, left: bool| {
            u32::try_from(b)
                .ok()
                .and_then(|s| if left { value.checked_shl(s) } else { value.checked_shr(s) })
                .unwrap_or(0)
        };
        let value = match op {
            ADD_OP => a.wrapping_add(b),
            SUBTRACT_OP => a.wrapping_sub(b),
            MULTIPLY_OP => a.wrapping_mul(b),
            SHIFT_LEFT_OP => shift(a, true),
            SHIFT_RIGHT_OP => shift(a, false),
            AND_OP => a & b,
            NAND_OP => !(a & b),
            OR_OP => a | b,
            NOR_OP => !(a | b),
            XOR_OP => a ^ b,
            MOD_OP => a.checked_rem(b).ok_or(AmlError::DivideByZero)?,
            _ => {
                debug_assert!(false, "eval_binary called for {op:#x}");
                return Err(AmlError::Internal("unexpected binary operator"));
            }
        };

        let result = Object::Integer(self.integer_width().truncate(value));
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }

    /// `Divide(Dividend, Divisor, Remainder, Quotient)`.
    pub(super) fn eval_divide(&self, ctx: &mut ParseContext<'_, '_>) -> Result<Object, AmlError> {
        let dividend = self.eval_integer(ctx)?;
        let divisor = self.eval_integer(ctx)?;
        let remainder_target = self.parse_target(ctx)?;
        let quotient_target = self.parse_target(ctx)?;
        if divisor == 0 {
            return Err(AmlError::DivideByZero);
        }
        let quotient = Object::Integer(dividend / divisor);
        self.store_target(ctx, remainder_target, &Object::Integer(dividend % divisor))?;
        self.store_target(ctx, quotient_target, &quotient)?;
        Ok(quotient)
    }

    /// `Not`, `FindSetLeftBit` and `FindSetRightBit`.
    pub(super) fn eval_unary(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        op: u8,
    ) -> Result<Object, AmlError> {
        let width = self.integer_width();
        let value = self.eval_integer(ctx)?;
        let target = self.parse_target(ctx)?;
        let result = match op {
            NOT_OP => width.truncate(!value),
            // Bit positions are one-based; zero means no bit set.
            FIND_SET_LEFT_BIT_OP if value != 0 => u64::from(64 - value.leading_zeros()),
            FIND_SET_RIGHT_BIT_OP if value != 0 => u64::from(value.trailing_zeros() + 1),
            _ => 0,
        };
        let result = Object::Integer(result);
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }

    /// `Increment` and `Decrement`: read, adjust and write back a
    /// `SuperName`.
    pub(super) fn eval_step(&self, ctx: &mut ParseContext<'_, '_>, op: u8) -> Result<Object, AmlError> {
        let width = self.integer_width();
        let target = self.parse_super_name(ctx)?;
        let current = self.read_reference(ctx.frame, &target)?;
        let current = convert::to_integer(&current, width)?;
        let next = if op == INCREMENT_OP {
            current.wrapping_add(1)
        } else {
            current.wrapping_sub(1)
        };
        let result = Object::Integer(width.truncate(next));
        self.store(ctx.frame, &target, result.clone())?;
        Ok(result)
    }

    /// `LAnd` and `LOr`. Both operands are always evaluated.
    pub(super) fn eval_logical(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        op: u8,
    ) -> Result<Object, AmlError> {
        let a = self.eval_integer(ctx)? != 0;
        let b = self.eval_integer(ctx)? != 0;
        Ok(self.boolean(if op == LAND_OP { a && b } else { a || b }))
    }

    /// `LEqual`, `LGreater` and `LLess`.
    pub(super) fn eval_compare(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        op: u8,
    ) -> Result<Object, AmlError> {
        let a = self.eval_operand(ctx)?;
        let b = self.eval_operand(ctx)?;
        let ordering = convert::compare(&a, &b, self.integer_width())?;
        Ok(self.boolean(match op {
            LEQUAL_OP => ordering.is_eq(),
            LGREATER_OP => ordering.is_gt(),
            _ => ordering.is_lt(),
        }))
    }

    /// `FromBCD` and `ToBCD`.
    pub(super) fn eval_bcd(&self, ctx: &mut ParseContext<'_, '_>, ext: u8) -> Result<Object, AmlError> {
        let width = self.integer_width();
        let value = self.eval_integer(ctx)?;
        let target = self.parse_target(ctx)?;
        let result = Object::Integer(if ext == EXT_TO_BCD_OP {
            convert::to_bcd(value, width)
        } else {
            convert::from_bcd(value, width)
        });
        self.store_target(ctx, target, &result)?;
        Ok(result)
    }
}

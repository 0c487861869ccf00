//! Operator evaluators.
//!
//! Each evaluator is entered with its opcode already consumed, parses its
//! operands through the term parser, computes the result, stores it into
//! the optional target and returns it.

mod data;
mod math;
mod refs;
mod sync;

use crate::Interpreter;
use crate::context::ParseContext;
use crate::error::AmlError;
use crate::handler::Handler;
use crate::object::{Object, Reference};
use crate::opcode::*;

impl<H: Handler> Interpreter<H> {
    /// Evaluates a single-byte operator.
    pub(crate) fn eval_operator(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        op: u8,
    ) -> Result<Object, AmlError> {
        match op {
            BUFFER_OP => self.eval_buffer(ctx),
            PACKAGE_OP => self.eval_package(ctx, false),
            VAR_PACKAGE_OP => self.eval_package(ctx, true),
            STORE_OP => self.eval_store(ctx),
            COPY_OBJECT_OP => self.eval_copy_object(ctx),
            REF_OF_OP => {
                let reference = self.parse_super_name(ctx)?;
                Ok(Object::Reference(reference))
            }
            DEREF_OF_OP => self.eval_deref_of(ctx),
            INDEX_OP => self.eval_index(ctx),
            OBJECT_TYPE_OP => self.eval_object_type(ctx),
            SIZE_OF_OP => self.eval_size_of(ctx),
            MATCH_OP => self.eval_match(ctx),
            ADD_OP | SUBTRACT_OP | MULTIPLY_OP | SHIFT_LEFT_OP | SHIFT_RIGHT_OP | AND_OP
            | NAND_OP | OR_OP | NOR_OP | XOR_OP | MOD_OP => self.eval_binary(ctx, op),
            DIVIDE_OP => self.eval_divide(ctx),
            NOT_OP | FIND_SET_LEFT_BIT_OP | FIND_SET_RIGHT_BIT_OP => self.eval_unary(ctx, op),
            INCREMENT_OP | DECREMENT_OP => self.eval_step(ctx, op),
            LAND_OP | LOR_OP => self.eval_logical(ctx, op),
            LNOT_OP => {
                let value = self.eval_integer(ctx)?;
                Ok(self.boolean(value == 0))
            }
            LEQUAL_OP | LGREATER_OP | LLESS_OP => self.eval_compare(ctx, op),
            CONCAT_OP => self.eval_concat(ctx),
            CONCAT_RES_OP => self.eval_concat_res(ctx),
            TO_BUFFER_OP | TO_DECIMAL_STRING_OP | TO_HEX_STRING_OP | TO_INTEGER_OP => {
                self.eval_conversion(ctx, op)
            }
            TO_STRING_OP => self.eval_to_string(ctx),
            MID_OP => self.eval_mid(ctx),
            _ => Err(AmlError::InvalidOpcode {
                opcode: op,
                extended: false,
            }),
        }
    }

    /// Evaluates an extended (`0x5B`-prefixed) operator.
    pub(crate) fn eval_ext_operator(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        ext: u8,
    ) -> Result<Object, AmlError> {
        match ext {
            EXT_COND_REF_OF_OP => self.eval_cond_ref_of(ctx),
            EXT_ACQUIRE_OP => self.eval_acquire(ctx),
            EXT_WAIT_OP => self.eval_wait(ctx),
            EXT_FROM_BCD_OP | EXT_TO_BCD_OP => self.eval_bcd(ctx, ext),
            EXT_REVISION_OP => Ok(Object::Integer(self.config.revision)),
            EXT_DEBUG_OP => Ok(Object::Reference(Reference::Debug)),
            EXT_TIMER_OP => Ok(Object::Integer(self.handler.timer_100ns())),
            EXT_LOAD_TABLE_OP => {
                log::warn!("aml: LoadTable in {} not supported", ctx.scope);
                Err(AmlError::InvalidOpcode {
                    opcode: ext,
                    extended: true,
                })
            }
            _ => Err(AmlError::InvalidOpcode {
                opcode: ext,
                extended: true,
            }),
        }
    }

    /// Executes an extended statement (no result), opcode already consumed.
    pub(crate) fn exec_ext_statement(
        &self,
        ctx: &mut ParseContext<'_, '_>,
        ext: u8,
    ) -> Result<(), AmlError> {
        match ext {
            EXT_RELEASE_OP => self.exec_release(ctx),
            EXT_SIGNAL_OP => self.exec_signal(ctx),
            EXT_RESET_OP => self.exec_reset(ctx),
            EXT_SLEEP_OP => {
                let ms = self.eval_integer(ctx)?;
                self.handler.sleep_ms(ms);
                Ok(())
            }
            EXT_STALL_OP => {
                let us = self.eval_integer(ctx)?;
                if us > 100 {
                    log::warn!("aml: Stall({us}) in {} exceeds 100us", ctx.scope);
                }
                self.handler.stall_us(us);
                Ok(())
            }
            EXT_FATAL_OP => self.exec_fatal(ctx),
            EXT_LOAD_OP => {
                log::warn!("aml: Load in {} not supported", ctx.scope);
                Err(AmlError::InvalidOpcode {
                    opcode: ext,
                    extended: true,
                })
            }
            _ => Err(AmlError::InvalidOpcode {
                opcode: ext,
                extended: true,
            }),
        }
    }

    /// The AML boolean for `value`: `Ones` or `Zero`.
    pub(crate) fn boolean(&self, value: bool) -> Object {
        Object::Integer(if value { self.integer_width().ones() } else { 0 })
    }
}

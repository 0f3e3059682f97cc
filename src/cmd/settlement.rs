//! Settlement command - report the outcome of a saved tax payment receipt

use super::{format_money, read_to_string};
use crate::tax::{parse_settlement, SettlementOutcome};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SettlementCommand {
    /// Settlement response saved from the tax service ("-" for stdin)
    #[arg(short, long)]
    file: PathBuf,
}

impl SettlementCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let receipt = parse_settlement(&read_to_string(&self.file)?)?;

        println!(
            "{} to {} from {}",
            format_money(receipt.tax_amount),
            receipt.authority,
            receipt.user_address
        );
        match receipt.outcome() {
            SettlementOutcome::Settled { tx_hash } => {
                println!("Settled on-chain: {}", tx_hash);
            }
            SettlementOutcome::InitializationRequired {
                wallet,
                instruction,
            } => {
                println!("Payer wallet must be initialized before settlement");
                if let Some(wallet) = wallet {
                    println!("  Wallet: {}", wallet);
                }
                if let Some(instruction) = instruction {
                    println!("  {}", instruction);
                }
            }
        }
        if let Some(message) = &receipt.message {
            println!("{}", message);
        }
        Ok(())
    }
}

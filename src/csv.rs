use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::model::{UserId, Wallet};
use crate::wallet::LedgerCommand;
use crate::Amount;

/// Errors that can occur when reading commands or writing balances
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("cannot open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized command type '{command}'")]
    UnrecognizedType { line: usize, command: String },

    #[error("line {line}: {command} missing amount")]
    MissingAmount { line: usize, command: String },

    #[error("line {line}: {command} amount must be positive, got {amount}")]
    InvalidAmount {
        line: usize,
        command: String,
        amount: f64,
    },

    #[error("line {line}: transfer missing recipient")]
    MissingRecipient { line: usize },

    #[error("failed to write balances: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush balances: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    user: String,
    to: Option<String>,
    amount: Option<f64>,
    note: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    user: &'a str,
    balance: String,
    currency: &'static str,
}

/// Read ledger commands from a csv file with header `type,user,to,amount,note`.
///
/// Amounts are in major units.
pub fn read_commands(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<LedgerCommand, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        }))
}

fn parse_row(line: usize, row: InputRow) -> Result<LedgerCommand, CsvError> {
    let command = row.r#type.to_ascii_lowercase();
    let user = UserId::new(row.user);
    let amount = || match row.amount {
        None => Err(CsvError::MissingAmount {
            line,
            command: command.clone(),
        }),
        Some(amount) if !amount.is_finite() || amount <= 0.0 => Err(CsvError::InvalidAmount {
            line,
            command: command.clone(),
            amount,
        }),
        Some(amount) => Ok(Amount::from_major(amount)),
    };

    match command.as_str() {
        "credit" => Ok(LedgerCommand::Credit {
            user,
            amount: amount()?,
        }),
        "debit" => Ok(LedgerCommand::Debit {
            user,
            amount: amount()?,
        }),
        "withdraw" => Ok(LedgerCommand::Withdraw {
            user,
            amount: amount()?,
        }),
        "transfer" => {
            let to = row
                .to
                .clone()
                .filter(|to| !to.is_empty())
                .ok_or(CsvError::MissingRecipient { line })?;
            Ok(LedgerCommand::Transfer {
                from: user,
                to: UserId::new(to),
                amount: amount()?,
                note: row.note.clone().unwrap_or_default(),
            })
        }
        _ => Err(CsvError::UnrecognizedType {
            line,
            command: command.clone(),
        }),
    }
}

/// Write wallet balances in csv format
pub fn write_wallets<'a, W: io::Write>(
    writer: W,
    wallets: impl IntoIterator<Item = &'a Wallet>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for wallet in wallets {
        writer.serialize(OutputRow {
            user: wallet.user_id.as_str(),
            balance: wallet.balance.amount.to_string(),
            currency: wallet.balance.currency.code(),
        })?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Currency;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn read(content: &str) -> Vec<Result<LedgerCommand, CsvError>> {
        let file = write_csv(content);
        read_commands(file.path()).unwrap().collect()
    }

    #[test]
    fn read_credit() {
        let results = read("type,user,to,amount,note\ncredit,alice,,10.5,\n");
        assert_eq!(results.len(), 1);

        match results.into_iter().next().unwrap().unwrap() {
            LedgerCommand::Credit { user, amount } => {
                assert_eq!(user, UserId::from("alice"));
                assert_eq!(amount, Amount::from_minor(1050));
            }
            other => panic!("expected credit, got {other:?}"),
        }
    }

    #[test]
    fn read_transfer() {
        let results = read("type,user,to,amount,note\ntransfer,alice,bob,2.25,lunch\n");

        match results.into_iter().next().unwrap().unwrap() {
            LedgerCommand::Transfer {
                from,
                to,
                amount,
                note,
            } => {
                assert_eq!(from, UserId::from("alice"));
                assert_eq!(to, UserId::from("bob"));
                assert_eq!(amount, Amount::from_minor(225));
                assert_eq!(note, "lunch");
            }
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn read_with_whitespace() {
        let results = read("type, user, to, amount, note\nwithdraw, alice, , 1.0, \n");
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Ok(LedgerCommand::Withdraw { .. })
        ));
    }

    #[test]
    fn read_returns_error_for_unknown_type() {
        let results = read("type,user,to,amount,note\nrefund,alice,,1.0,\n");
        assert!(matches!(
            results[0],
            Err(CsvError::UnrecognizedType { line: 2, .. })
        ));
    }

    #[test]
    fn read_returns_error_for_missing_amount() {
        let results = read("type,user,to,amount,note\ndebit,alice,,,\n");
        assert!(matches!(
            results[0],
            Err(CsvError::MissingAmount { line: 2, .. })
        ));
    }

    #[test]
    fn read_returns_error_for_non_positive_amount() {
        let results = read(
            "type,user,to,amount,note\n\
             debit,alice,,-1e30,\n\
             credit,alice,,0,\n\
             transfer,alice,bob,-2.5,\n\
             withdraw,alice,,NaN,\n\
             credit,alice,,0.01,\n",
        );

        assert_eq!(results.len(), 5);
        for (idx, result) in results[..4].iter().enumerate() {
            assert!(
                matches!(result, Err(CsvError::InvalidAmount { line, .. }) if *line == idx + 2),
                "row {idx}: {result:?}"
            );
        }
        assert!(matches!(results[4], Ok(LedgerCommand::Credit { .. })));
    }

    #[test]
    fn read_returns_error_for_transfer_without_recipient() {
        let results = read("type,user,to,amount,note\ntransfer,alice,,1.0,\n");
        assert!(matches!(
            results[0],
            Err(CsvError::MissingRecipient { line: 2 })
        ));
    }

    #[test]
    fn read_missing_file_fails() {
        assert!(matches!(
            read_commands("/definitely/not/here.csv"),
            Err(CsvError::Open { .. })
        ));
    }

    #[test]
    fn write_wallets_renders_major_units() {
        let mut wallet = Wallet::new(UserId::from("alice"), Currency::Ngn);
        wallet.balance.amount = Amount::from_minor(7050);

        let mut out = Vec::new();
        write_wallets(&mut out, [&wallet]).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "user,balance,currency\nalice,70.50,NGN\n"
        );
    }
}

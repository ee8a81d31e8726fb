use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::model::RequestId;
use crate::{Amount, Command, UserId};

/// Errors that can occur when reading command rows
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized command type '{op}'")]
    UnrecognizedType { line: usize, op: String },

    #[error("line {line}: {op} missing {field}")]
    MissingField {
        line: usize,
        op: String,
        field: &'static str,
    },

    #[error("failed to write balances: {0}")]
    Write(#[from] csv::Error),
}

/// One command per row:
///
/// ```text
/// type,user,to,amount,fee,label,date,request
/// name,u1,,,,Ada,,
/// deposit,u1,,450.00,,Salary,,
/// withdraw,u1,,100,,,,
/// transfer,u1,u2,50,,James,,
/// request,u1,,100,3.5,,2025-06-01,
/// approve,,,,,,,1
/// reject,,,,,,,2
/// paid,,,,,,,1
/// ```
#[derive(Debug, Deserialize)]
struct InputRow {
    r#type: String,
    user: Option<UserId>,
    to: Option<UserId>,
    amount: Option<f64>,
    fee: Option<f64>,
    label: Option<String>,
    date: Option<NaiveDate>,
    request: Option<RequestId>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    user: &'a str,
    balance: String,
}

impl InputRow {
    fn into_command(self, line: usize) -> Result<Command, CsvError> {
        let op = self.r#type.to_lowercase();
        let missing = |field| CsvError::MissingField {
            line,
            op: op.clone(),
            field,
        };

        let command = match op.as_str() {
            "deposit" => Command::Deposit {
                user: self.user.ok_or_else(|| missing("user"))?,
                amount: self.amount.map(Amount::from_float).ok_or_else(|| missing("amount"))?,
                title: self.label.unwrap_or_else(|| "Deposit".to_string()),
            },
            "withdraw" | "withdrawal" => Command::Withdraw {
                user: self.user.ok_or_else(|| missing("user"))?,
                amount: self.amount.map(Amount::from_float).ok_or_else(|| missing("amount"))?,
            },
            "name" => Command::SetDisplayName {
                user: self.user.ok_or_else(|| missing("user"))?,
                name: self.label.ok_or_else(|| missing("label"))?,
            },
            "transfer" => {
                let to = self.to.ok_or_else(|| missing("to"))?;
                Command::Transfer {
                    from: self.user.ok_or_else(|| missing("user"))?,
                    amount: self.amount.map(Amount::from_float).ok_or_else(|| missing("amount"))?,
                    recipient_name: self.label.unwrap_or_else(|| to.clone()),
                    to,
                }
            }
            "request" => Command::RequestAdvance {
                user: self.user.ok_or_else(|| missing("user"))?,
                amount: self.amount.map(Amount::from_float).ok_or_else(|| missing("amount"))?,
                fee: self.fee.map(Amount::from_float).ok_or_else(|| missing("fee"))?,
                repayment_date: self.date.ok_or_else(|| missing("date"))?,
            },
            "approve" => Command::ApproveAdvance {
                request: self.request.ok_or_else(|| missing("request"))?,
            },
            "reject" => Command::RejectAdvance {
                request: self.request.ok_or_else(|| missing("request"))?,
            },
            "paid" => Command::MarkAdvancePaid {
                request: self.request.ok_or_else(|| missing("request"))?,
            },
            _ => {
                return Err(CsvError::UnrecognizedType {
                    line,
                    op: self.r#type,
                });
            }
        };
        Ok(command)
    }
}

/// Read commands from a csv file
pub fn read_commands(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Command, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
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
            row.into_command(line)
        }))
}

/// Write wallet balances in csv format
pub fn write_balances<W: io::Write>(
    writer: W,
    balances: impl IntoIterator<Item = (UserId, Amount)>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for (user, balance) in balances {
        writer.serialize(OutputRow {
            user: &user,
            balance: balance.to_string(),
        })?;
    }

    writer.flush().map_err(|e| CsvError::Write(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,user,to,amount,fee,label,date,request\n";

    fn write_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        file.write_all(rows.as_bytes()).unwrap();
        file
    }

    fn read(rows: &str) -> Vec<Result<Command, CsvError>> {
        let file = write_csv(rows);
        read_commands(file.path()).unwrap().collect()
    }

    #[test]
    fn read_deposit() {
        let results = read("deposit,u1,,10.5,,Salary,,\n");
        assert_eq!(results.len(), 1);

        match results.into_iter().next().unwrap().unwrap() {
            Command::Deposit {
                user,
                amount,
                title,
            } => {
                assert_eq!(user, "u1");
                assert_eq!(amount, Amount::from_minor(1_050));
                assert_eq!(title, "Salary");
            }
            other => panic!("expected deposit, got {other:?}"),
        }
    }

    #[test]
    fn read_transfer_defaults_recipient_name_to_receiver() {
        let results = read("transfer,u1,u2,5,,,,\n");
        match results.into_iter().next().unwrap().unwrap() {
            Command::Transfer {
                from,
                to,
                recipient_name,
                ..
            } => {
                assert_eq!(from, "u1");
                assert_eq!(to, "u2");
                assert_eq!(recipient_name, "u2");
            }
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn read_display_name() {
        let results = read("name,u1,,,,Ada,,\nname,u2,,,,,,\n");
        assert!(matches!(
            &results[0],
            Ok(Command::SetDisplayName { user, name }) if user == "u1" && name == "Ada"
        ));
        assert!(matches!(
            results[1].as_ref().unwrap_err(),
            CsvError::MissingField { line: 3, field: "label", .. }
        ));
    }

    #[test]
    fn read_advance_request() {
        let results = read("request,u1,,10000,350,,2025-06-01,\n");
        match results.into_iter().next().unwrap().unwrap() {
            Command::RequestAdvance {
                user,
                amount,
                fee,
                repayment_date,
            } => {
                assert_eq!(user, "u1");
                assert_eq!(amount, Amount::from_major(10_000));
                assert_eq!(fee, Amount::from_major(350));
                assert_eq!(repayment_date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn read_request_transitions() {
        let results = read("approve,,,,,,,1\nreject,,,,,,,2\npaid,,,,,,,1\n");
        assert!(matches!(
            results[0],
            Ok(Command::ApproveAdvance { request: 1 })
        ));
        assert!(matches!(results[1], Ok(Command::RejectAdvance { request: 2 })));
        assert!(matches!(
            results[2],
            Ok(Command::MarkAdvancePaid { request: 1 })
        ));
    }

    #[test]
    fn read_with_whitespace() {
        let results = read("withdraw , u1 , , 10.0 , , , , \n");
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn read_returns_error_for_unknown_type() {
        let results = read("borrow,u1,,10.0,,,,\n");
        let err = results[0].as_ref().unwrap_err();
        assert!(matches!(err, CsvError::UnrecognizedType { line: 2, .. }));
    }

    #[test]
    fn read_returns_error_for_missing_field() {
        let results = read("deposit,u1,,,,,,\nrequest,u1,,100,3.5,,,\n");
        assert!(matches!(
            results[0].as_ref().unwrap_err(),
            CsvError::MissingField { line: 2, field: "amount", .. }
        ));
        assert!(matches!(
            results[1].as_ref().unwrap_err(),
            CsvError::MissingField { line: 3, field: "date", .. }
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
    fn write_balances_formats_minor_units() {
        let mut out = Vec::new();
        write_balances(
            &mut out,
            vec![
                ("u1".to_string(), Amount::from_major(40_000)),
                ("u2".to_string(), Amount::from_minor(501)),
            ],
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "user,balance\nu1,40000.00\nu2,5.01\n"
        );
    }
}

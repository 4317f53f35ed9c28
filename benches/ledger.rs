use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use market_ledger::wallet::{PercentageFee, TransferRequest, WithdrawRequest};
use market_ledger::{Amount, Currency, Ledger, LedgerCommand, UserId, WalletService};

/// Generates valid command sequences for benchmarking.
///
/// Pattern per user (repeating):
/// 1. Credit 100
/// 2. Transfer 50 to the next user
/// 3. Withdraw 30
///
/// Every user is credited before paying out, so nothing is rejected.
pub struct CommandGenerator {
    users: Vec<UserId>,
    commands_per_user: u32,
    current_user: usize,
    current_step: u32,
}

impl CommandGenerator {
    pub fn new(num_users: usize, commands_per_user: u32) -> Self {
        Self {
            users: (0..num_users).map(|i| UserId::new(format!("user-{i}"))).collect(),
            commands_per_user,
            current_user: 0,
            current_step: 0,
        }
    }
}

impl Iterator for CommandGenerator {
    type Item = LedgerCommand;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_user >= self.users.len() {
            return None;
        }

        let user = self.users[self.current_user].clone();
        let command = match self.current_step % 3 {
            0 => LedgerCommand::Credit {
                user,
                amount: Amount::from_minor(10_000),
            },
            1 => LedgerCommand::Transfer {
                from: user,
                to: self.users[(self.current_user + 1) % self.users.len()].clone(),
                amount: Amount::from_minor(5_000),
                note: String::new(),
            },
            _ => LedgerCommand::Withdraw {
                user,
                amount: Amount::from_minor(3_000),
            },
        };

        self.current_step += 1;
        if self.current_step >= self.commands_per_user {
            self.current_step = 0;
            self.current_user += 1;
        }

        Some(command)
    }
}

fn service() -> WalletService {
    WalletService::with_fee_policy(
        Arc::new(Ledger::new(Currency::Ngn)),
        Arc::new(PercentageFee { bps: 50 }),
    )
}

fn bench_credits(c: &mut Criterion) {
    let mut group = c.benchmark_group("credits");

    for count in [1_000u32, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let service = service();
                let user = UserId::from("u");
                for _ in 0..count {
                    let _ = black_box(service.adjust_balance(&user, Amount::from_minor(100)));
                }
                service
            });
        });
    }

    group.finish();
}

fn bench_mixed_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed");

    for (users, per_user) in [(100usize, 300u32), (1_000, 30), (10, 3_000)] {
        let label = format!("{users}u_{per_user}cmd");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(users, per_user),
            |b, &(users, per_user)| {
                b.iter(|| {
                    let service = service();
                    for command in CommandGenerator::new(users, per_user) {
                        let _ = black_box(service.apply(command));
                    }
                    service
                });
            },
        );
    }

    group.finish();
}

fn bench_idempotent_requests(c: &mut Criterion) {
    let mut group = c.benchmark_group("idempotent");

    // every other request repeats the previous key
    group.bench_function("10k_transfers_half_duplicate", |b| {
        b.iter(|| {
            let service = service();
            let alice = UserId::from("alice");
            let bob = UserId::from("bob");
            let _ = service.adjust_balance(&alice, Amount::from_minor(100_000_000));
            for n in 0..10_000u32 {
                let _ = black_box(service.transfer(TransferRequest {
                    from: alice.clone(),
                    from_name: "Alice".into(),
                    from_email: String::new(),
                    to: bob.clone(),
                    to_name: "Bob".into(),
                    to_email: String::new(),
                    amount: Amount::from_minor(100),
                    note: String::new(),
                    idempotency_key: Some(format!("t-{}", n / 2)),
                }));
            }
            let _ = black_box(service.withdraw(WithdrawRequest {
                user_id: bob,
                email: String::new(),
                amount: Amount::from_minor(100),
                idempotency_key: None,
            }));
            service
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_credits,
    bench_mixed_commands,
    bench_idempotent_requests,
);

criterion_main!(benches);

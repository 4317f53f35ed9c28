use crate::{Amount, Currency};

/// Decides the fee charged on top of a withdrawal.
pub trait WithdrawalFeePolicy: Send + Sync {
    fn fee(&self, amount: Amount, currency: Currency) -> Amount;
}

/// Withdrawals are free.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFee;

impl WithdrawalFeePolicy for NoFee {
    fn fee(&self, _amount: Amount, _currency: Currency) -> Amount {
        Amount::ZERO
    }
}

/// Fee proportional to the withdrawn amount, in basis points.
#[derive(Debug, Clone, Copy)]
pub struct PercentageFee {
    pub bps: u32,
}

impl WithdrawalFeePolicy for PercentageFee {
    fn fee(&self, amount: Amount, _currency: Currency) -> Amount {
        amount.percent_bps(self.bps)
    }
}

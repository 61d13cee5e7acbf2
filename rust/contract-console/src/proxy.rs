//! Contract proxies bound to an ABI and an address

use std::fmt;

use alloy::{
    contract::{ContractInstance, Interface},
    json_abi::JsonAbi,
    primitives::Address,
    providers::Provider,
};

/// Constructs one proxy per deployment.
pub trait ProxyFactory {
    type Proxy;

    fn bind(
        &self,
        display_name: &str,
        address: Address,
        abi: JsonAbi,
    ) -> anyhow::Result<Self::Proxy>;
}

impl<F: ProxyFactory + ?Sized> ProxyFactory for &F {
    type Proxy = F::Proxy;

    fn bind(
        &self,
        display_name: &str,
        address: Address,
        abi: JsonAbi,
    ) -> anyhow::Result<Self::Proxy> {
        (**self).bind(display_name, address, abi)
    }
}

/// A named dynamic contract instance.
#[derive(Clone)]
pub struct ContractProxy<P> {
    name: String,
    instance: ContractInstance<P>,
}

impl<P: Provider> ContractProxy<P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        self.instance.address()
    }

    pub fn abi(&self) -> &JsonAbi {
        self.instance.abi()
    }

    pub fn instance(&self) -> &ContractInstance<P> {
        &self.instance
    }
}

impl<P: Provider> fmt::Debug for ContractProxy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractProxy")
            .field("name", &self.name)
            .field("address", self.address())
            .finish()
    }
}

impl<P: Provider> fmt::Display for ContractProxy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} '{}'>", self.name, self.address().to_checksum(None))
    }
}

/// Binds proxies to a shared chain provider.
#[derive(Debug, Clone)]
pub struct ProviderProxyFactory<P> {
    provider: P,
}

impl<P> ProviderProxyFactory<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: Provider + Clone> ProxyFactory for ProviderProxyFactory<P> {
    type Proxy = ContractProxy<P>;

    fn bind(
        &self,
        display_name: &str,
        address: Address,
        abi: JsonAbi,
    ) -> anyhow::Result<Self::Proxy> {
        let instance = ContractInstance::new(address, self.provider.clone(), Interface::new(abi));
        Ok(ContractProxy {
            name: display_name.to_string(),
            instance,
        })
    }
}
